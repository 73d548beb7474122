use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use sqlx::{self, types::Json};

use super::GameTheme;

pub const MIN_CATEGORIES: usize = 5;
pub const MAX_CATEGORIES: usize = 6;
pub const QUESTIONS_PER_CATEGORY: usize = 4;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameBoard {
    pub id: String,
    pub user_id: String,

    pub title: String,
    pub description: Option<String>,

    pub categories: Json<Vec<Category>>,
    pub theme: Json<GameTheme>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameBoard {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        return self
            .categories
            .iter()
            .flat_map(|c| c.questions.iter())
            .find(|q| q.id == question_id);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub questions: Vec<Question>,
}

impl Category {
    /// A blank category holding the fixed 100/200/300/400 ladder.
    pub fn blank() -> Self {
        let questions = (0..QUESTIONS_PER_CATEGORY)
            .map(|i| Question {
                id: nanoid!(),
                points: ((i as i32) + 1) * 100,
                question: String::new(),
                answer: String::new(),
            })
            .collect();

        return Self {
            id: nanoid!(),
            name: String::new(),
            questions,
        };
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub points: i32,
    pub question: String,
    pub answer: String,
}

/// The working copy of a board being created or edited: everything a
/// stored board has except identity and timestamps. This is what gets
/// mirrored into the session as a draft and posted by the board form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoardDraft {
    pub title: String,
    pub description: String,
    pub categories: Vec<Category>,
    pub theme: GameTheme,
}

impl BoardDraft {
    pub fn blank() -> Self {
        return Self {
            title: String::new(),
            description: String::new(),
            categories: (0..MIN_CATEGORIES).map(|_| Category::blank()).collect(),
            theme: GameTheme::default(),
        };
    }

    pub fn from_board(board: &GameBoard) -> Self {
        return Self {
            title: board.title.clone(),
            description: board.description.clone().unwrap_or_default(),
            categories: board.categories.0.clone(),
            theme: board.theme.0.clone(),
        };
    }

    pub fn add_category(&mut self) {
        if self.categories.len() < MAX_CATEGORIES {
            self.categories.push(Category::blank());
        }
    }

    pub fn remove_category(&mut self, index: usize) {
        if self.categories.len() > MIN_CATEGORIES && index < self.categories.len() {
            self.categories.remove(index);
        }
    }

    /// Form-level validation. Returns every problem at once so the form
    /// can show them all; an empty list means the draft may be saved.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.title.trim().is_empty() {
            problems.push("Game title is required".to_string());
        }

        if self.categories.len() < MIN_CATEGORIES || self.categories.len() > MAX_CATEGORIES {
            problems.push(format!(
                "A board needs between {MIN_CATEGORIES} and {MAX_CATEGORIES} categories"
            ));
        }

        for (ci, category) in self.categories.iter().enumerate() {
            if category.name.trim().is_empty() {
                problems.push(format!("Category {} needs a name", ci + 1));
            }

            if category.questions.len() != QUESTIONS_PER_CATEGORY {
                problems.push(format!(
                    "Category {} must have exactly {QUESTIONS_PER_CATEGORY} questions",
                    ci + 1
                ));
                continue;
            }

            for (qi, question) in category.questions.iter().enumerate() {
                if question.question.trim().is_empty() {
                    problems.push(format!(
                        "Category {}, question {} has no question text",
                        ci + 1,
                        qi + 1
                    ));
                }
                if question.answer.trim().is_empty() {
                    problems.push(format!(
                        "Category {}, question {} has no answer text",
                        ci + 1,
                        qi + 1
                    ));
                }
            }
        }

        return problems;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_draft() -> BoardDraft {
        let mut draft = BoardDraft::blank();
        draft.title = "Office Trivia".to_string();
        for (ci, category) in draft.categories.iter_mut().enumerate() {
            category.name = format!("Category {ci}");
            for question in category.questions.iter_mut() {
                question.question = format!("Q for {} points", question.points);
                question.answer = format!("A for {} points", question.points);
            }
        }
        return draft;
    }

    #[test]
    fn blank_draft_has_five_categories_of_four_questions() {
        let draft = BoardDraft::blank();

        assert_eq!(draft.categories.len(), MIN_CATEGORIES);
        for category in &draft.categories {
            assert_eq!(category.questions.len(), QUESTIONS_PER_CATEGORY);
            let points: Vec<i32> = category.questions.iter().map(|q| q.points).collect();
            assert_eq!(points, vec![100, 200, 300, 400]);
        }
    }

    #[test]
    fn filled_draft_passes_validation() {
        assert!(filled_draft().validate().is_empty());
    }

    #[test]
    fn empty_title_blocks_submission() {
        let mut draft = filled_draft();
        draft.title = "   ".to_string();

        let problems = draft.validate();
        assert!(problems.iter().any(|p| p.contains("title")));
    }

    #[test]
    fn empty_category_name_blocks_submission() {
        let mut draft = filled_draft();
        draft.categories[2].name = String::new();

        let problems = draft.validate();
        assert!(problems.iter().any(|p| p.contains("Category 3")));
    }

    #[test]
    fn empty_question_or_answer_blocks_submission() {
        let mut draft = filled_draft();
        draft.categories[0].questions[1].question = String::new();
        draft.categories[4].questions[3].answer = "  ".to_string();

        let problems = draft.validate();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn too_few_categories_blocks_submission() {
        let mut draft = filled_draft();
        draft.categories.truncate(4);

        assert!(!draft.validate().is_empty());
    }

    #[test]
    fn add_category_is_capped_at_six() {
        let mut draft = filled_draft();
        draft.add_category();
        assert_eq!(draft.categories.len(), 6);

        draft.add_category();
        assert_eq!(draft.categories.len(), 6);
    }

    #[test]
    fn remove_category_keeps_the_minimum_of_five() {
        let mut draft = filled_draft();
        draft.add_category();
        draft.remove_category(5);
        assert_eq!(draft.categories.len(), 5);

        draft.remove_category(0);
        assert_eq!(draft.categories.len(), 5);
    }

    #[test]
    fn draft_round_trips_through_json() {
        let draft = filled_draft();

        let json = serde_json::to_string(&draft).unwrap();
        let restored: BoardDraft = serde_json::from_str(&json).unwrap();

        assert_eq!(draft, restored);
    }
}
