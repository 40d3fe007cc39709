use serde::Serialize;

use super::quiz::QuizData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AttemptState {
    InProgress { index: usize },
    Answered { index: usize, correct: bool },
    Completed { score: usize, total: usize },
}

/// One pass through a quiz. Answers are kept per question so moving back
/// restores what was chosen before.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz: QuizData,
    index: usize,
    selected: Option<usize>,
    answers: Vec<Option<usize>>,
    checked: bool,
    completed: bool,
}

impl QuizAttempt {
    pub fn new(quiz: QuizData) -> Self {
        let answers = vec![None; quiz.questions.len()];
        let completed = quiz.questions.is_empty();
        Self {
            quiz,
            index: 0,
            selected: None,
            answers,
            checked: false,
            completed,
        }
    }

    pub fn quiz(&self) -> &QuizData {
        &self.quiz
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn state(&self) -> AttemptState {
        if self.completed {
            AttemptState::Completed {
                score: self.score(),
                total: self.quiz.questions.len(),
            }
        } else if self.checked {
            AttemptState::Answered {
                index: self.index,
                correct: self.answers[self.index] == Some(self.correct_option(self.index)),
            }
        } else {
            AttemptState::InProgress { index: self.index }
        }
    }

    /// Only honoured while the current question is still open. Returns
    /// whether the selection was taken.
    pub fn select_option(&mut self, option: usize) -> bool {
        if self.completed || self.checked {
            return false;
        }
        if option >= self.quiz.questions[self.index].options.len() {
            return false;
        }
        self.selected = Some(option);
        true
    }

    /// Records the selected option. Without a selection nothing happens.
    pub fn check_answer(&mut self) -> Option<bool> {
        if self.completed || self.checked {
            return None;
        }
        let option = self.selected?;
        self.answers[self.index] = Some(option);
        self.checked = true;
        Some(option == self.correct_option(self.index))
    }

    /// Advances past an answered question, completing after the last one.
    pub fn next(&mut self) -> AttemptState {
        if self.checked && !self.completed {
            if self.index + 1 < self.quiz.questions.len() {
                self.index += 1;
                self.selected = self.answers[self.index];
                self.checked = false;
            } else {
                self.completed = true;
            }
        }
        self.state()
    }

    /// Reopens the previous question with its recorded answer selected.
    /// From the completed state this is the last question.
    pub fn previous(&mut self) -> AttemptState {
        let target = if self.completed {
            self.quiz.questions.len().checked_sub(1)
        } else {
            self.index.checked_sub(1)
        };
        if let Some(index) = target {
            self.index = index;
            self.selected = self.answers[index];
            self.checked = false;
            self.completed = false;
        }
        self.state()
    }

    /// Recorded answers that match the correct option.
    pub fn score(&self) -> usize {
        self.answers
            .iter()
            .enumerate()
            .filter(|(i, answer)| **answer == Some(self.correct_option(*i)))
            .count()
    }

    fn correct_option(&self, index: usize) -> usize {
        self.quiz.questions[index].correct_answer
    }
}
