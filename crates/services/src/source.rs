use drill_core::model::{Band, Question, QuestionKind};

/// Produces practice questions for a difficulty band.
///
/// Generation is expected to be random, so asking twice for the same band
/// may or may not yield the same question. Sources without "why" or
/// habit-fixing material may answer every kind with a standard question.
pub trait QuestionSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Generate one question of `kind` at `band`.
    ///
    /// # Errors
    ///
    /// Implementation defined; the selector returns it unchanged.
    fn generate(&mut self, band: Band, kind: QuestionKind) -> Result<Question, Self::Error>;
}

impl<S: QuestionSource + ?Sized> QuestionSource for &mut S {
    type Error = S::Error;

    fn generate(&mut self, band: Band, kind: QuestionKind) -> Result<Question, Self::Error> {
        (**self).generate(band, kind)
    }
}

/// Adapts a closure into a [`QuestionSource`].
///
/// ```
/// # use drill_core::model::{Band, Question, QuestionKind};
/// # use services::source::{FnSource, QuestionSource};
/// let mut source = FnSource::new(|band: Band, _kind: QuestionKind| {
///     Ok::<_, std::convert::Infallible>(Question::new(format!("{band} + 1"), format!("{}", band.value() + 1)))
/// });
/// let question = source.generate(Band::new(3), QuestionKind::Standard).unwrap();
/// assert_eq!(question.correct_answer(), "4");
/// ```
pub struct FnSource<F> {
    generate: F,
}

impl<F> FnSource<F> {
    #[must_use]
    pub fn new(generate: F) -> Self {
        Self { generate }
    }
}

impl<F, E> QuestionSource for FnSource<F>
where
    F: FnMut(Band, QuestionKind) -> Result<Question, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn generate(&mut self, band: Band, kind: QuestionKind) -> Result<Question, E> {
        (self.generate)(band, kind)
    }
}
