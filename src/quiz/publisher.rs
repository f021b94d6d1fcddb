use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{info, warn};
use teloxide::prelude::*;
use teloxide::types::{PollType, Recipient};
use teloxide::RequestError;

use crate::quiz::QuizRecord;

/// Something that can post a quiz as a single-answer poll.
pub trait PollSender {
    type Err: Display;

    fn send_quiz_poll(
        &self,
        chat: Recipient,
        quiz: &QuizRecord,
    ) -> impl Future<Output = Result<(), Self::Err>> + Send;
}

impl PollSender for Bot {
    type Err = RequestError;

    fn send_quiz_poll(
        &self,
        chat: Recipient,
        quiz: &QuizRecord,
    ) -> impl Future<Output = Result<(), Self::Err>> + Send {
        let mut request = self
            .send_poll(chat, quiz.question(), quiz.options().to_vec())
            .type_(PollType::Quiz)
            .correct_option_id(quiz.correct_index() as u8)
            .is_anonymous(true);
        if !quiz.explanation().is_empty() {
            request = request.explanation(quiz.explanation());
        }

        async move { request.await.map(|_| ()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    /// Position of the quiz in the published batch.
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub total: usize,
    pub posted: usize,
    pub failures: Vec<PublishFailure>,
}

impl PublishReport {
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("✅ Posted all {} quizzes.", self.total)
        } else {
            format!(
                "⚠️ Posted {} of {} quizzes, {} failed.",
                self.posted,
                self.total,
                self.failures.len()
            )
        }
    }
}

/// Sends every quiz once, in order, waiting `spacing` between consecutive polls.
/// A failed poll is recorded and the rest of the batch still goes out.
pub async fn publish_batch<S: PollSender>(
    sender: &S,
    chat: &Recipient,
    quizzes: &[QuizRecord],
    spacing: Duration,
) -> PublishReport {
    let mut report = PublishReport {
        total: quizzes.len(),
        ..Default::default()
    };

    for (index, quiz) in quizzes.iter().enumerate() {
        if index > 0 && !spacing.is_zero() {
            tokio::time::sleep(spacing).await;
        }
        match sender.send_quiz_poll(chat.clone(), quiz).await {
            Ok(()) => report.posted += 1,
            Err(err) => {
                warn!("Failed to post quiz #{} to {:?}: {}", index + 1, chat, err);
                report.failures.push(PublishFailure {
                    index,
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        "Published {}/{} quizzes to {:?}",
        report.posted, report.total, chat
    );
    report
}
