use thiserror::Error;
use url::Url;

use crate::model::ids::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {0} has no options")]
    NoOptions(QuestionId),
}

/// A single multiple-choice question as delivered to the student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    image: Option<Url>,
    options: Vec<String>,
    correct_option: Option<String>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError::NoOptions` if `options` is empty.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, QuestionError> {
        if options.is_empty() {
            return Err(QuestionError::NoOptions(id));
        }
        Ok(Self {
            id,
            prompt: prompt.into(),
            image: None,
            options,
            correct_option: None,
        })
    }

    #[must_use]
    pub fn with_image(mut self, image: Url) -> Self {
        self.image = Some(image);
        self
    }

    /// Attach the answer key. Kept for review screens only; attempts never read it.
    #[must_use]
    pub fn with_correct_option(mut self, option: impl Into<String>) -> Self {
        self.correct_option = Some(option.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn image(&self) -> Option<&Url> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<&str> {
        self.correct_option.as_deref()
    }

    /// Returns true if `option` is one of this question's choices.
    #[must_use]
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_question_without_options() {
        let err = Question::new(QuestionId::new("q1"), "2 + 2?", Vec::new()).unwrap_err();
        assert_eq!(err, QuestionError::NoOptions(QuestionId::new("q1")));
    }

    #[test]
    fn offers_matches_exact_option_text() {
        let q = Question::new(
            QuestionId::new("q1"),
            "2 + 2?",
            vec!["3".into(), "4".into()],
        )
        .unwrap();
        assert!(q.offers("4"));
        assert!(!q.offers("4 "));
        assert!(!q.offers("5"));
    }

    #[test]
    fn builder_attaches_review_metadata() {
        let image = Url::parse("https://cdn.example.org/q1.png").unwrap();
        let q = Question::new(QuestionId::new("q1"), "Which shape?", vec!["A".into()])
            .unwrap()
            .with_image(image.clone())
            .with_correct_option("A");
        assert_eq!(q.image(), Some(&image));
        assert_eq!(q.correct_option(), Some("A"));
    }
}
