use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use exam_core::model::{
    AttemptSubmission, AvailabilityWindow, Question, QuestionId, SubmissionResult,
    TestDefinition, TestId,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::repository::StoreError;

fn ser<E: core::fmt::Display>(e: E) -> StoreError {
    StoreError::Serialization(e.to_string())
}

//
// ─── WIRE SHAPES ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TestDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub questions: Vec<QuestionDto>,
    /// Whole minutes.
    pub duration: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(default)]
    pub image: Option<String>,
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionDto<'a> {
    pub test_id: &'a TestId,
    pub student_id: &'a str,
    pub answers: &'a BTreeMap<QuestionId, String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmissionResponseDto {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

//
// ─── MAPPING ──────────────────────────────────────────────────────────────────
//

pub(crate) fn map_question(dto: QuestionDto) -> Result<Question, StoreError> {
    let mut question =
        Question::new(QuestionId::new(dto.id), dto.prompt, dto.options).map_err(ser)?;

    if let Some(raw) = dto.image.filter(|raw| !raw.trim().is_empty()) {
        question = question.with_image(Url::parse(raw.trim()).map_err(ser)?);
    }
    if let Some(correct) = dto.correct_answer {
        question = question.with_correct_option(correct);
    }
    Ok(question)
}

pub(crate) fn map_test(dto: TestDto) -> Result<TestDefinition, StoreError> {
    let window = AvailabilityWindow::new(dto.start_time, dto.end_time).map_err(ser)?;
    let questions = dto
        .questions
        .into_iter()
        .map(map_question)
        .collect::<Result<Vec<_>, _>>()?;

    TestDefinition::new(TestId::new(dto.id), dto.title, questions, dto.duration, window)
        .map_err(ser)
}

pub(crate) fn submission_body(submission: &AttemptSubmission) -> SubmissionDto<'_> {
    SubmissionDto {
        test_id: submission.test_id(),
        student_id: submission.student_id().as_str(),
        answers: submission.answers(),
    }
}

pub(crate) fn map_submission_response(dto: SubmissionResponseDto) -> SubmissionResult {
    SubmissionResult {
        submission_id: dto.id,
        score: dto.score,
        already_recorded: false,
    }
}
