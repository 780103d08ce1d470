//! Results and scoring engine
//!
//! This module computes the aggregated outcome of a session: per-question
//! correctness, timing statistics, and the final ranked scores. It reads
//! the question snapshot and the per-question submission records the
//! session accumulated; it never mutates anything.
//!
//! The scoring rule is the decaying reward: for each question, correct
//! submitters are ranked by submission time and the submitter at rank `n`
//! earns `points / n`, rounded to one decimal place. Scores accumulate
//! across questions; the final ordering is by total score descending with
//! ties broken by join order.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::Serialize;
use web_time::SystemTime;

use crate::{
    player::{self, Players},
    quiz::question::{Question, QuestionId},
    session::Round,
};

/// Aggregated outcome of one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    /// The question this result belongs to
    pub question_id: QuestionId,
    /// Names of players whose submission matched the correct answer set
    /// exactly, ordered by submission time ascending
    pub players_correct_list: Vec<String>,
    /// Mean time between question open and submission, in whole rounded
    /// seconds; 0 if nobody submitted
    pub average_answer_time: u64,
    /// Percentage of joined players who submitted a correct answer set
    pub percent_correct: u32,
}

/// One entry of the final ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerScore {
    /// The player's name
    pub name: String,
    /// The player's accumulated score
    pub score: f64,
}

/// Aggregated outcome of a whole session
#[derive(Debug, Clone, Serialize)]
pub struct FinalResults {
    /// Players ordered by total score descending, ties broken by join order
    pub users_ranked_by_score: Vec<PlayerScore>,
    /// Per-question results for every question that was played
    pub question_results: Vec<QuestionResult>,
}

/// Rounds a score contribution to one decimal place
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Returns the correct submitters of a question, fastest first
///
/// A submission counts as correct when its answer-id set equals the
/// question's correct-id set exactly.
fn correct_submitters(question: &Question, round: &Round) -> Vec<(player::Id, SystemTime)> {
    let correct = question.correct_ids();
    round
        .submissions
        .iter()
        .filter(|(_, submission)| {
            let chosen: HashSet<_> = submission.answer_ids.iter().copied().collect();
            chosen == correct
        })
        .map(|(id, submission)| (*id, submission.submitted_at))
        .sorted_by_key(|(_, submitted_at)| *submitted_at)
        .collect_vec()
}

/// Computes the aggregated outcome of one question
pub fn question_result(question: &Question, round: &Round, players: &Players) -> QuestionResult {
    let correct = correct_submitters(question, round);

    let average_answer_time = {
        let times = round
            .submissions
            .values()
            .filter_map(|submission| submission.submitted_at.duration_since(round.opened_at).ok())
            .collect_vec();
        if times.is_empty() {
            0
        } else {
            let total: f64 = times.iter().map(web_time::Duration::as_secs_f64).sum();
            (total / times.len() as f64).round() as u64
        }
    };

    let percent_correct = if players.is_empty() {
        0
    } else {
        ((correct.len() as f64 / players.len() as f64) * 100.0).round() as u32
    };

    QuestionResult {
        question_id: question.id(),
        players_correct_list: correct
            .iter()
            .filter_map(|(id, _)| players.name(*id))
            .collect(),
        average_answer_time,
        percent_correct,
    }
}

/// Computes the final ranked scores and per-question results of a session
///
/// `rounds` holds one record per question that was actually opened; a
/// session ended early simply contributes fewer rounds. Every joined player
/// appears in the ranking, scoring 0 if they never submitted a correct
/// answer.
pub fn final_results(questions: &[Question], rounds: &[Round], players: &Players) -> FinalResults {
    let mut totals: HashMap<player::Id, f64> = HashMap::new();
    for (question, round) in questions.iter().zip(rounds) {
        for (rank, (id, _)) in correct_submitters(question, round).iter().enumerate() {
            let earned = f64::from(question.points()) / (rank + 1) as f64;
            *totals.entry(*id).or_default() += round_one_decimal(earned);
        }
    }

    // Iterating in join order plus a stable sort keeps ties in join order
    let users_ranked_by_score = players
        .ids()
        .iter()
        .filter_map(|id| {
            Some(PlayerScore {
                name: players.name(*id)?,
                score: totals.get(id).copied().unwrap_or(0.0),
            })
        })
        .sorted_by(|a, b| b.score.total_cmp(&a.score))
        .collect_vec();

    FinalResults {
        users_ranked_by_score,
        question_results: questions
            .iter()
            .zip(rounds)
            .map(|(question, round)| question_result(question, round, players))
            .collect(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use crate::{
        quiz::question::{AnswerConfig, QuestionConfig},
        session::Submission,
    };

    use super::*;

    fn question(points: u32) -> Question {
        Question::from_config(&QuestionConfig {
            text: "What is the capital of France?".to_owned(),
            duration: Duration::from_secs(30),
            points,
            answers: vec![
                AnswerConfig {
                    text: "Paris".to_owned(),
                    correct: true,
                },
                AnswerConfig {
                    text: "Lyon".to_owned(),
                    correct: false,
                },
            ],
            thumbnail: None,
        })
        .unwrap()
    }

    fn submission_at(
        question: &Question,
        correct: bool,
        opened_at: SystemTime,
        seconds_in: u64,
    ) -> Submission {
        let answer = question
            .answers()
            .iter()
            .find(|a| a.correct == correct)
            .unwrap();
        Submission {
            answer_ids: vec![answer.id],
            submitted_at: opened_at + Duration::from_secs(seconds_in),
        }
    }

    #[test]
    fn test_half_correct_yields_fifty_percent() {
        let question = question(5);
        let mut players = Players::default();
        let (a, _) = players.join("A").unwrap();
        let (b, _) = players.join("B").unwrap();

        let opened_at = SystemTime::now();
        let round = Round {
            opened_at,
            submissions: HashMap::from([
                (a, submission_at(&question, true, opened_at, 1)),
                (b, submission_at(&question, false, opened_at, 2)),
            ]),
        };

        let result = question_result(&question, &round, &players);
        assert_eq!(result.percent_correct, 50);
        assert_eq!(result.players_correct_list, vec!["A".to_owned()]);
    }

    #[test]
    fn test_correct_list_ordered_by_submission_time() {
        let question = question(5);
        let mut players = Players::default();
        let (a, _) = players.join("A").unwrap();
        let (b, _) = players.join("B").unwrap();
        let (c, _) = players.join("C").unwrap();

        let opened_at = SystemTime::now();
        let round = Round {
            opened_at,
            submissions: HashMap::from([
                (a, submission_at(&question, true, opened_at, 9)),
                (b, submission_at(&question, true, opened_at, 2)),
                (c, submission_at(&question, true, opened_at, 5)),
            ]),
        };

        let result = question_result(&question, &round, &players);
        assert_eq!(
            result.players_correct_list,
            vec!["B".to_owned(), "C".to_owned(), "A".to_owned()]
        );
        assert_eq!(result.percent_correct, 100);
    }

    #[test]
    fn test_average_answer_time_rounds_to_whole_seconds() {
        let question = question(5);
        let mut players = Players::default();
        let (a, _) = players.join("A").unwrap();
        let (b, _) = players.join("B").unwrap();

        let opened_at = SystemTime::now();
        let round = Round {
            opened_at,
            submissions: HashMap::from([
                (a, submission_at(&question, true, opened_at, 1)),
                (b, submission_at(&question, false, opened_at, 4)),
            ]),
        };

        // (1 + 4) / 2 = 2.5, rounds to 3
        let result = question_result(&question, &round, &players);
        assert_eq!(result.average_answer_time, 3);
    }

    #[test]
    fn test_no_submissions_average_is_zero() {
        let question = question(5);
        let mut players = Players::default();
        players.join("A").unwrap();

        let round = Round {
            opened_at: SystemTime::now(),
            submissions: HashMap::new(),
        };

        let result = question_result(&question, &round, &players);
        assert_eq!(result.average_answer_time, 0);
        assert_eq!(result.percent_correct, 0);
        assert!(result.players_correct_list.is_empty());
    }

    #[test]
    fn test_partial_answer_set_is_not_correct() {
        // Question where both answers are correct: submitting only one of
        // them must not count
        let question = Question::from_config(&QuestionConfig {
            text: "Select every even number".to_owned(),
            duration: Duration::from_secs(30),
            points: 5,
            answers: vec![
                AnswerConfig {
                    text: "2".to_owned(),
                    correct: true,
                },
                AnswerConfig {
                    text: "4".to_owned(),
                    correct: true,
                },
            ],
            thumbnail: None,
        })
        .unwrap();

        let mut players = Players::default();
        let (a, _) = players.join("A").unwrap();
        let opened_at = SystemTime::now();
        let round = Round {
            opened_at,
            submissions: HashMap::from([(
                a,
                Submission {
                    answer_ids: vec![question.answers()[0].id],
                    submitted_at: opened_at + Duration::from_secs(1),
                },
            )]),
        };

        let result = question_result(&question, &round, &players);
        assert!(result.players_correct_list.is_empty());
    }

    #[test]
    fn test_decaying_scores_across_ranks() {
        let question = question(3);
        let mut players = Players::default();
        let (a, _) = players.join("A").unwrap();
        let (b, _) = players.join("B").unwrap();
        let (c, _) = players.join("C").unwrap();

        let opened_at = SystemTime::now();
        let rounds = vec![Round {
            opened_at,
            submissions: HashMap::from([
                (a, submission_at(&question, true, opened_at, 1)),
                (b, submission_at(&question, true, opened_at, 2)),
                (c, submission_at(&question, true, opened_at, 3)),
            ]),
        }];

        let results = final_results(&[question], &rounds, &players);
        let ranked = &results.users_ranked_by_score;
        assert_eq!(ranked[0], PlayerScore { name: "A".to_owned(), score: 3.0 });
        assert_eq!(ranked[1], PlayerScore { name: "B".to_owned(), score: 1.5 });
        // 3 / 3 = 1.0
        assert_eq!(ranked[2], PlayerScore { name: "C".to_owned(), score: 1.0 });
    }

    #[test]
    fn test_score_contributions_round_to_one_decimal() {
        let question = question(1);
        let mut players = Players::default();
        let (a, _) = players.join("A").unwrap();
        let (b, _) = players.join("B").unwrap();
        let (c, _) = players.join("C").unwrap();

        let opened_at = SystemTime::now();
        let rounds = vec![Round {
            opened_at,
            submissions: HashMap::from([
                (a, submission_at(&question, true, opened_at, 1)),
                (b, submission_at(&question, true, opened_at, 2)),
                (c, submission_at(&question, true, opened_at, 3)),
            ]),
        }];

        let results = final_results(&[question], &rounds, &players);
        // 1 / 3 = 0.333..., rounds to 0.3
        assert_eq!(results.users_ranked_by_score[2].score, 0.3);
    }

    #[test]
    fn test_ties_break_by_join_order() {
        let question = question(5);
        let mut players = Players::default();
        players.join("First").unwrap();
        players.join("Second").unwrap();

        // Nobody submits: everyone scores 0 and the ranking keeps join order
        let rounds = vec![Round {
            opened_at: SystemTime::now(),
            submissions: HashMap::new(),
        }];

        let results = final_results(&[question], &rounds, &players);
        let names: Vec<_> = results
            .users_ranked_by_score
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        assert_eq!(names, vec!["First".to_owned(), "Second".to_owned()]);
        assert!(results
            .users_ranked_by_score
            .iter()
            .all(|entry| entry.score == 0.0));
    }

    #[test]
    fn test_scores_accumulate_across_questions() {
        let first = question(4);
        let second = question(2);
        let mut players = Players::default();
        let (a, _) = players.join("A").unwrap();
        let (b, _) = players.join("B").unwrap();

        let opened_at = SystemTime::now();
        let rounds = vec![
            Round {
                opened_at,
                submissions: HashMap::from([
                    (a, submission_at(&first, true, opened_at, 1)),
                    (b, submission_at(&first, true, opened_at, 2)),
                ]),
            },
            Round {
                opened_at,
                submissions: HashMap::from([(b, submission_at(&second, true, opened_at, 1))]),
            },
        ];

        let results = final_results(&[first, second], &rounds, &players);
        // A: 4, B: 4/2 + 2 = 4 as well; tie broken by join order
        assert_eq!(results.users_ranked_by_score[0].name, "A");
        assert_eq!(results.users_ranked_by_score[0].score, 4.0);
        assert_eq!(results.users_ranked_by_score[1].name, "B");
        assert_eq!(results.users_ranked_by_score[1].score, 4.0);
        assert_eq!(results.question_results.len(), 2);
    }
}
