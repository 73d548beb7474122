use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    models::{Category, QuestionState},
    prelude::*,
};

const PLAY_KEY: &str = "play";

/// Delay before the completion overlay appears, so the last graded card
/// is visible for a beat first. Consumed by the play template.
pub const COMPLETE_REVEAL_DELAY_MS: u64 = 500;

/// Everything a playthrough needs between requests: the persisted
/// session row id plus the ephemeral per-question states and modal
/// position. Discarded wholesale on "play again" or board deletion.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlayState {
    pub session_id: String,
    pub board_id: String,
    pub player_name: String,
    pub question_states: Vec<QuestionState>,
    pub selected: Option<String>,
    pub answer_shown: bool,
    pub complete: bool,
}

impl PlayState {
    pub fn new(
        session_id: String,
        board_id: String,
        player_name: String,
        categories: &[Category],
    ) -> Self {
        return Self {
            session_id,
            board_id,
            player_name,
            question_states: init_question_states(categories),
            selected: None,
            answer_shown: false,
            complete: false,
        };
    }

    pub fn state_of(&self, question_id: &str) -> Option<&QuestionState> {
        return self.question_states.iter().find(|qs| qs.id == question_id);
    }

    /// `unrevealed → revealed` (or staying in `revealed`). Selecting an
    /// already-answered question is a no-op and reports `false`.
    pub fn select_question(&mut self, question_id: &str) -> bool {
        let Some(state) = self
            .question_states
            .iter_mut()
            .find(|qs| qs.id == question_id)
        else {
            return false;
        };

        if state.answered {
            return false;
        }

        state.revealed = true;
        self.selected = Some(question_id.to_string());
        self.answer_shown = false;

        return true;
    }

    pub fn reveal_answer(&mut self) {
        if self.selected.is_some() {
            self.answer_shown = true;
        }
    }

    pub fn close_question(&mut self) {
        self.selected = None;
        self.answer_shown = false;
    }

    /// `revealed → answered(correct | incorrect)`, terminal. Returns the
    /// graded question id, or `None` when no question was open.
    pub fn grade(&mut self, correct: bool) -> Option<String> {
        let question_id = self.selected.take()?;
        self.answer_shown = false;

        if let Some(state) = self
            .question_states
            .iter_mut()
            .find(|qs| qs.id == question_id)
        {
            state.answered = true;
            state.correct = Some(correct);
        }

        return Some(question_id);
    }
}

pub fn init_question_states(categories: &[Category]) -> Vec<QuestionState> {
    return categories
        .iter()
        .flat_map(|c| c.questions.iter())
        .map(|q| QuestionState::fresh(&q.id))
        .collect();
}

/// Total score recomputed from full state: the sum of point values of
/// every question that is answered and correct. Never incremented, so
/// the result is idempotent and order-independent.
pub fn calculate_score(categories: &[Category], states: &[QuestionState]) -> i32 {
    return categories
        .iter()
        .flat_map(|c| c.questions.iter())
        .filter(|q| {
            states
                .iter()
                .find(|s| s.id == q.id)
                .is_some_and(|s| s.answered && s.correct == Some(true))
        })
        .map(|q| q.points)
        .sum();
}

/// True iff every question on the board has a state marked answered.
/// A question with no state at all counts as unanswered.
pub fn is_game_complete(categories: &[Category], states: &[QuestionState]) -> bool {
    return categories.iter().flat_map(|c| c.questions.iter()).all(|q| {
        states
            .iter()
            .find(|s| s.id == q.id)
            .is_some_and(|s| s.answered)
    });
}

pub fn load_play(session: &Session) -> Result<Option<PlayState>> {
    return Ok(session.get(PLAY_KEY)?);
}

pub fn save_play(session: &Session, state: &PlayState) -> Result {
    session.insert(PLAY_KEY, state)?;
    return Ok(());
}

pub fn clear_play(session: &Session) -> Result {
    session.remove::<PlayState>(PLAY_KEY)?;
    return Ok(());
}

/// Drops any in-flight playthrough of the given board, e.g. after the
/// board itself was deleted.
pub fn clear_play_for_board(session: &Session, board_id: &str) -> Result {
    if let Some(state) = load_play(session)? {
        if state.board_id == board_id {
            clear_play(session)?;
        }
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;

    fn board_categories() -> Vec<Category> {
        return (0..5)
            .map(|ci| Category {
                id: format!("cat{ci}"),
                name: format!("Category {ci}"),
                questions: (0..4)
                    .map(|qi| Question {
                        id: format!("q{ci}-{qi}"),
                        points: (qi + 1) * 100,
                        question: format!("question {ci}/{qi}"),
                        answer: format!("answer {ci}/{qi}"),
                    })
                    .collect(),
            })
            .collect();
    }

    fn fresh_state(categories: &[Category]) -> PlayState {
        return PlayState::new(
            "sess1".to_string(),
            "board1".to_string(),
            "Alex".to_string(),
            categories,
        );
    }

    #[test]
    fn states_cover_every_question_unrevealed() {
        let categories = board_categories();
        let state = fresh_state(&categories);

        assert_eq!(state.question_states.len(), 20);
        assert!(state
            .question_states
            .iter()
            .all(|qs| !qs.revealed && !qs.answered && qs.correct.is_none()));
    }

    #[test]
    fn two_correct_answers_in_one_category_score_their_sum() {
        let categories = board_categories();
        let mut state = fresh_state(&categories);

        // 100- and 300-point questions of the first category correct,
        // everything else untouched.
        assert!(state.select_question("q0-0"));
        state.reveal_answer();
        state.grade(true);

        assert!(state.select_question("q0-2"));
        state.reveal_answer();
        state.grade(true);

        assert_eq!(calculate_score(&categories, &state.question_states), 400);
    }

    #[test]
    fn incorrect_answers_score_nothing() {
        let categories = board_categories();
        let mut state = fresh_state(&categories);

        state.select_question("q1-3");
        state.grade(false);

        assert_eq!(calculate_score(&categories, &state.question_states), 0);
    }

    #[test]
    fn score_recomputation_is_idempotent() {
        let categories = board_categories();
        let mut state = fresh_state(&categories);

        state.select_question("q2-1");
        state.grade(true);

        let first = calculate_score(&categories, &state.question_states);
        let second = calculate_score(&categories, &state.question_states);
        assert_eq!(first, second);
        assert_eq!(first, 200);
    }

    #[test]
    fn answered_questions_cannot_be_reselected() {
        let categories = board_categories();
        let mut state = fresh_state(&categories);

        state.select_question("q0-0");
        state.grade(false);

        assert!(!state.select_question("q0-0"));
        assert_eq!(state.selected, None);

        let qs = state.state_of("q0-0").unwrap();
        assert!(qs.answered);
        assert_eq!(qs.correct, Some(false));
    }

    #[test]
    fn reselecting_a_revealed_question_is_legal() {
        let categories = board_categories();
        let mut state = fresh_state(&categories);

        state.select_question("q0-0");
        state.close_question();

        assert!(state.select_question("q0-0"));
        assert!(!state.answer_shown);
    }

    #[test]
    fn grade_without_an_open_question_is_a_no_op() {
        let categories = board_categories();
        let mut state = fresh_state(&categories);

        assert_eq!(state.grade(true), None);
        assert_eq!(calculate_score(&categories, &state.question_states), 0);
    }

    #[test]
    fn game_is_complete_only_when_every_question_is_answered() {
        let categories = board_categories();
        let mut state = fresh_state(&categories);

        assert!(!is_game_complete(&categories, &state.question_states));

        let ids: Vec<String> = categories
            .iter()
            .flat_map(|c| c.questions.iter())
            .map(|q| q.id.clone())
            .collect();

        for id in &ids[..ids.len() - 1] {
            state.select_question(id);
            state.grade(id.ends_with("0"));
        }
        assert!(!is_game_complete(&categories, &state.question_states));

        state.select_question(ids.last().unwrap());
        state.grade(true);
        assert!(is_game_complete(&categories, &state.question_states));
    }

    #[test]
    fn missing_question_state_means_incomplete() {
        let categories = board_categories();
        let mut states = init_question_states(&categories);
        for qs in states.iter_mut() {
            qs.answered = true;
        }

        states.pop();

        assert!(!is_game_complete(&categories, &states));
    }
}
