//! Data types used by the aggregation pipeline.

use serde::{Deserialize, Serialize};

/// Kind of graded work a score belongs to.
///
/// Any tag other than `exam`, `quiz` or `homework` deserializes to
/// [`Category::Other`] and never contributes to an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Exam,
    Quiz,
    Homework,
    #[serde(other)]
    Other,
}

impl Category {
    /// The categories that carry a weight, in reporting order.
    pub const WEIGHTED: [Category; 3] = [Category::Exam, Category::Quiz, Category::Homework];

    /// Parses a stored type tag, mapping unknown tags to [`Category::Other`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "exam" => Category::Exam,
            "quiz" => Category::Quiz,
            "homework" => Category::Homework,
            _ => Category::Other,
        }
    }
}

/// One scored piece of work inside a grade record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type")]
    pub category: Category,
    pub score: f64,
}

impl ScoreEntry {
    pub fn new(category: Category, score: f64) -> Self {
        Self { category, score }
    }
}

/// A learner's scores for one class, as held by the grades store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub learner_id: i64,
    pub class_id: i64,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}

/// Scores of one aggregation group, split by weighted category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBuckets {
    pub(crate) exam: Vec<f64>,
    pub(crate) quiz: Vec<f64>,
    pub(crate) homework: Vec<f64>,
}

impl CategoryBuckets {
    /// Scores recorded for `category`, in insertion order.
    ///
    /// [`Category::Other`] never holds scores and always yields an empty slice.
    pub fn get(&self, category: Category) -> &[f64] {
        match category {
            Category::Exam => &self.exam,
            Category::Quiz => &self.quiz,
            Category::Homework => &self.homework,
            Category::Other => &[],
        }
    }

    /// Appends `score` to its bucket. Returns `false` if the category is not weighted.
    pub(crate) fn push(&mut self, category: Category, score: f64) -> bool {
        match category {
            Category::Exam => self.exam.push(score),
            Category::Quiz => self.quiz.push(score),
            Category::Homework => self.homework.push(score),
            Category::Other => return false,
        }
        true
    }

    /// True when no weighted category has any score.
    pub fn is_empty(&self) -> bool {
        self.exam.is_empty() && self.quiz.is_empty() && self.homework.is_empty()
    }

    /// Total number of scores across all buckets.
    pub fn len(&self) -> usize {
        self.exam.len() + self.quiz.len() + self.homework.len()
    }

    /// Flattens the buckets back into `(category, score)` pairs, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::WEIGHTED
            .into_iter()
            .flat_map(move |c| self.get(c).iter().map(move |s| (c, *s)))
    }
}

/// Fixed weight table applied to per-category means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub exam: f64,
    pub quiz: f64,
    pub homework: f64,
}

/// Exams 50%, quizzes 30%, homework 20%.
pub const DEFAULT_WEIGHTS: Weights = Weights {
    exam: 0.5,
    quiz: 0.3,
    homework: 0.2,
};

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn weight(&self, category: Category) -> f64 {
        match category {
            Category::Exam => self.exam,
            Category::Quiz => self.quiz,
            Category::Homework => self.homework,
            Category::Other => 0.0,
        }
    }
}

/// First-stage result: the weighted average of one grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedResult {
    pub key: i64,
    pub average: Option<f64>,
}

/// Weighted average of a learner's scores within one class.
///
/// A class whose scores all fall outside the weighted categories is still
/// reported, with `average` serialized as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassAverage {
    pub class_id: i64,
    pub average: Option<f64>,
}

impl From<WeightedResult> for ClassAverage {
    fn from(result: WeightedResult) -> Self {
        Self {
            class_id: result.key,
            average: result.average,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_deserializes_unknown_tag_as_other() {
        let entry: ScoreEntry = serde_json::from_str(r#"{"type":"project","score":12}"#).unwrap();
        assert_eq!(entry.category, Category::Other);
        assert_eq!(entry.score, 12.0);

        let entry: ScoreEntry = serde_json::from_str(r#"{"type":"exam","score":88.5}"#).unwrap();
        assert_eq!(entry.category, Category::Exam);
    }

    #[test]
    fn test_grade_record_ignores_store_fields() {
        let json = r#"{"_id":"64b0c","learner_id":7,"class_id":339,
            "scores":[{"type":"quiz","score":40}]}"#;
        let record: GradeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.learner_id, 7);
        assert_eq!(record.class_id, 339);
        assert_eq!(record.scores, vec![ScoreEntry::new(Category::Quiz, 40.0)]);
    }

    #[test]
    fn test_grade_record_without_scores() {
        let record: GradeRecord =
            serde_json::from_str(r#"{"learner_id":1,"class_id":2}"#).unwrap();
        assert!(record.scores.is_empty());
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(Category::from_tag("homework"), Category::Homework);
        assert_eq!(Category::from_tag(" quiz "), Category::Quiz);
        assert_eq!(Category::from_tag("Exam"), Category::Other);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = Weights::default();
        let sum: f64 = Category::WEIGHTED.iter().map(|c| w.weight(*c)).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(w.weight(Category::Other), 0.0);
    }

    #[test]
    fn test_class_average_serializes_missing_as_null() {
        let row = ClassAverage {
            class_id: 10,
            average: None,
        };
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"class_id":10,"average":null}"#
        );
    }
}
