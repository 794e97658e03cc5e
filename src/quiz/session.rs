use thiserror::Error;

use crate::scoring::{
    classify, AttributeDef, AttributeTable, Classification, ClassifyError, ClassifyOptions,
    FeatureValue, Features, Weights,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    NotStarted,
    /// Waiting for an answer to the attribute at this index
    Answering(usize),
    Completed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    #[error("quiz has not been started")]
    NotStarted,

    #[error("quiz is already in progress")]
    AlreadyStarted,

    #[error("quiz is already completed")]
    Completed,

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

/// One pass through the table's attributes, one question per attribute.
///
/// Every event that moves the session forward re-runs [`classify`] on the
/// answers collected so far; unanswered and skipped attributes use their
/// defaults. An answer the engine rejects leaves the session where it was.
pub struct QuizSession<'a> {
    table: &'a AttributeTable,
    weights: &'a Weights,
    options: ClassifyOptions,
    state: QuizState,
    answers: Features,
    skipped: Vec<String>,
}

impl<'a> QuizSession<'a> {
    pub fn new(table: &'a AttributeTable, weights: &'a Weights, options: ClassifyOptions) -> Self {
        Self {
            table,
            weights,
            options,
            state: QuizState::NotStarted,
            answers: Features::new(),
            skipped: Vec::new(),
        }
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn answers(&self) -> &Features {
        &self.answers
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// The attribute currently being asked, if any.
    pub fn current_question(&self) -> Option<&'a AttributeDef> {
        match self.state {
            QuizState::Answering(i) => self.table.attributes.get(i),
            _ => None,
        }
    }

    /// `(questions handled, total questions)`
    pub fn progress(&self) -> (usize, usize) {
        let total = self.table.attributes.len();
        let done = match self.state {
            QuizState::NotStarted => 0,
            QuizState::Answering(i) => i,
            QuizState::Completed => total,
        };
        (done, total)
    }

    /// Begin the quiz. Returns the all-defaults classification.
    pub fn start(&mut self) -> Result<Classification, QuizError> {
        if self.state != QuizState::NotStarted {
            return Err(QuizError::AlreadyStarted);
        }
        let result = self.classify_current()?;
        self.state = if self.table.attributes.is_empty() {
            QuizState::Completed
        } else {
            QuizState::Answering(0)
        };
        Ok(result)
    }

    /// Answer the current question and advance.
    pub fn answer(&mut self, value: FeatureValue) -> Result<Classification, QuizError> {
        let attr = self.expect_question()?;
        let previous = self.answers.remove(&attr.name);
        self.answers.set(&attr.name, value);

        match self.classify_current() {
            Ok(result) => {
                self.advance();
                Ok(result)
            }
            Err(e) => {
                self.answers.remove(&attr.name);
                if let Some(previous) = previous {
                    self.answers.set(&attr.name, previous);
                }
                Err(e)
            }
        }
    }

    /// Leave the current question at its default and advance.
    pub fn skip(&mut self) -> Result<Classification, QuizError> {
        let attr = self.expect_question()?;
        let result = self.classify_current()?;
        self.skipped.push(attr.name.clone());
        self.advance();
        Ok(result)
    }

    fn expect_question(&self) -> Result<&'a AttributeDef, QuizError> {
        match self.state {
            QuizState::NotStarted => Err(QuizError::NotStarted),
            QuizState::Completed => Err(QuizError::Completed),
            QuizState::Answering(_) => self.current_question().ok_or(QuizError::Completed),
        }
    }

    fn advance(&mut self) {
        if let QuizState::Answering(i) = self.state {
            self.state = if i + 1 >= self.table.attributes.len() {
                QuizState::Completed
            } else {
                QuizState::Answering(i + 1)
            };
        }
    }

    fn classify_current(&self) -> Result<Classification, QuizError> {
        Ok(classify(&self.answers, self.weights, self.table, &self.options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (AttributeTable, Weights) {
        (AttributeTable::default(), Weights::default())
    }

    #[test]
    fn test_events_before_start_rejected() {
        let (table, weights) = fixtures();
        let mut quiz = QuizSession::new(&table, &weights, ClassifyOptions::default());
        assert_eq!(quiz.state(), QuizState::NotStarted);
        assert_eq!(quiz.answer("hot".into()), Err(QuizError::NotStarted));
        assert_eq!(quiz.skip(), Err(QuizError::NotStarted));
        assert!(quiz.current_question().is_none());
    }

    #[test]
    fn test_start_classifies_defaults() {
        let (table, weights) = fixtures();
        let mut quiz = QuizSession::new(&table, &weights, ClassifyOptions::default());
        let result = quiz.start().unwrap();
        assert_eq!(result.majority, "salad");
        assert_eq!(quiz.state(), QuizState::Answering(0));
        assert_eq!(quiz.current_question().unwrap().name, "temperature");
        assert_eq!(quiz.start(), Err(QuizError::AlreadyStarted));
    }

    #[test]
    fn test_full_run_matches_direct_classification() {
        let (table, weights) = fixtures();
        let mut quiz = QuizSession::new(&table, &weights, ClassifyOptions::default());
        quiz.start().unwrap();

        let answers: Vec<FeatureValue> = vec![
            "hot".into(),
            "spoon".into(),
            "bowl".into(),
            1.0.into(),
            0.0.into(),
            false.into(),
            false.into(),
            0.0.into(),
        ];
        let mut last = None;
        for answer in answers {
            last = Some(quiz.answer(answer).unwrap());
        }

        assert_eq!(quiz.state(), QuizState::Completed);
        assert_eq!(quiz.progress(), (8, 8));
        let direct = classify(quiz.answers(), &weights, &table, &ClassifyOptions::default())
            .unwrap();
        assert_eq!(last.unwrap(), direct);
        assert_eq!(direct.majority, "soup");
        assert_eq!(quiz.skip(), Err(QuizError::Completed));
    }

    #[test]
    fn test_each_answer_updates_running_result() {
        let (table, weights) = fixtures();
        let mut quiz = QuizSession::new(&table, &weights, ClassifyOptions::default());
        let initial = quiz.start().unwrap();
        let after = quiz.answer("hot".into()).unwrap();
        assert!(after.percent_of("soup").unwrap() > initial.percent_of("soup").unwrap());
        assert_eq!(quiz.progress(), (1, 8));
    }

    #[test]
    fn test_skip_keeps_default() {
        let (table, weights) = fixtures();
        let mut quiz = QuizSession::new(&table, &weights, ClassifyOptions::default());
        quiz.start().unwrap();
        quiz.skip().unwrap();
        assert_eq!(quiz.skipped(), ["temperature".to_string()]);
        assert!(quiz.answers().get("temperature").is_none());
        assert_eq!(quiz.current_question().unwrap().name, "utensil");
    }

    #[test]
    fn test_rejected_answer_does_not_advance() {
        let (table, weights) = fixtures();
        let mut quiz = QuizSession::new(&table, &weights, ClassifyOptions::default());
        quiz.start().unwrap();
        let err = quiz.answer("scalding".into()).unwrap_err();
        assert!(matches!(
            err,
            QuizError::Classify(ClassifyError::InvalidAttributeValue { .. })
        ));
        assert_eq!(quiz.state(), QuizState::Answering(0));
        assert!(quiz.answers().is_empty());
    }

    #[test]
    fn test_empty_table_completes_on_start() {
        let table = AttributeTable {
            categories: vec!["only".to_string()],
            attributes: vec![],
        };
        let weights = Weights::empty();
        let mut quiz = QuizSession::new(&table, &weights, ClassifyOptions::default());
        let result = quiz.start().unwrap();
        assert!(result.degenerate);
        assert_eq!(quiz.state(), QuizState::Completed);
    }
}
