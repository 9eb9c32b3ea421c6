//! Static problem catalog and randomized interview set generation
//!
//! The built-in catalog is embedded at compile time. Every random step takes an
//! explicit `Rng` so callers (and tests) control the source of randomness.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Difficulty, Language, Problem, Question, QuestionType};

/// Embedded problem set (compiled into binary)
const BUILTIN_PROBLEMS: &str = include_str!("../data/problems.json");

#[derive(Deserialize)]
struct CatalogFile {
    problems: Vec<Problem>,
}

/// How many questions of each difficulty an interview set asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyMix {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl DifficultyMix {
    /// 40% easy, 40% medium (both rounded up), hard takes the remainder.
    ///
    /// Medium is capped by what easy left over, so the three buckets always sum
    /// to `total` and hard is never negative.
    pub fn for_total(total: usize) -> Self {
        let forty_percent = (total * 2).div_ceil(5);
        let easy = forty_percent.min(total);
        let medium = forty_percent.min(total - easy);
        let hard = total - easy - medium;
        Self { easy, medium, hard }
    }

    pub fn count(&self, difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }
}

/// Read-only collection of interview problems
#[derive(Debug, Clone, Default)]
pub struct ProblemCatalog {
    problems: Vec<Problem>,
}

impl ProblemCatalog {
    pub fn new(problems: Vec<Problem>) -> Self {
        Self { problems }
    }

    /// Load the catalog that ships with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_PROBLEMS)
    }

    /// Parse a catalog document of the form `{"problems": [...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if file.problems.is_empty() {
            return Err(Error::Catalog("catalog contains no problems".to_string()));
        }
        debug!("Loaded {} problems into catalog", file.problems.len());
        Ok(Self::new(file.problems))
    }

    pub fn all(&self) -> &[Problem] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&Problem> {
        self.problems
            .iter()
            .filter(|p| p.difficulty == difficulty)
            .collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Problem> {
        self.problems
            .iter()
            .filter(|p| p.category == category)
            .collect()
    }

    /// Draw up to `count` distinct problems, optionally restricted to one difficulty.
    ///
    /// Returns fewer than `count` when the pool is smaller.
    pub fn random_problems<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        difficulty: Option<Difficulty>,
    ) -> Vec<Problem> {
        let pool: Vec<&Problem> = match difficulty {
            Some(d) => self.by_difficulty(d),
            None => self.problems.iter().collect(),
        };

        if pool.len() < count {
            debug!(
                "Requested {} {:?} problems but only {} available",
                count,
                difficulty,
                pool.len()
            );
        }

        pool.choose_multiple(rng, count)
            .map(|p| (*p).clone())
            .collect()
    }

    /// Starter code for a problem, python when the language template is empty
    pub fn starter_code(&self, problem_id: &str, language: Language) -> String {
        match self.by_id(problem_id) {
            Some(problem) => problem.starter_code.get(language).to_string(),
            None => format!("// Problem not found: {problem_id}"),
        }
    }

    pub fn hints(&self, problem_id: &str) -> Vec<String> {
        self.by_id(problem_id)
            .map(|p| p.hints.clone())
            .unwrap_or_default()
    }

    /// Build a mixed-difficulty interview of `total` questions.
    ///
    /// Ordinals are assigned in draw order, the list is shuffled, and the
    /// ordinals are then rewritten to match the final position.
    pub fn generate_interview_set<R: Rng + ?Sized>(
        &self,
        total: usize,
        rng: &mut R,
    ) -> Vec<Question> {
        let mix = DifficultyMix::for_total(total);

        let mut drawn: Vec<Problem> = Vec::with_capacity(mix.total());
        for &difficulty in Difficulty::all() {
            drawn.extend(self.random_problems(rng, mix.count(difficulty), Some(difficulty)));
        }

        let mut questions: Vec<Question> = drawn
            .iter()
            .enumerate()
            .map(|(i, problem)| problem_to_question(problem, i as u32 + 1))
            .collect();

        questions.shuffle(rng);
        for (i, question) in questions.iter_mut().enumerate() {
            question.number = i as u32 + 1;
        }

        debug!(
            "Generated interview set: {} questions ({} easy, {} medium, {} hard requested)",
            questions.len(),
            mix.easy,
            mix.medium,
            mix.hard
        );

        questions
    }
}

/// Convert a catalog problem into an interview question
pub fn problem_to_question(problem: &Problem, number: u32) -> Question {
    Question {
        id: problem.id.clone(),
        number,
        question_type: QuestionType::CodingChallenge,
        difficulty: problem.difficulty,
        title: problem.title.clone(),
        description: format_description(problem),
        starter_code: Some(problem.starter_code.clone()),
        problem: Some(problem.clone()),
    }
}

/// Problem description with examples and constraints appended as markdown
pub fn format_description(problem: &Problem) -> String {
    let mut description = problem.description.clone();

    if !problem.examples.is_empty() {
        description.push_str("\n\n**Examples:**\n");
        for (i, example) in problem.examples.iter().enumerate() {
            description.push_str(&format!("\nExample {}:\n", i + 1));
            description.push_str(&format!("Input: {}\n", example.input));
            description.push_str(&format!("Output: {}\n", example.output));
            if let Some(explanation) = &example.explanation {
                description.push_str(&format!("Explanation: {explanation}\n"));
            }
        }
    }

    if !problem.constraints.is_empty() {
        description.push_str("\n\n**Constraints:**\n");
        for constraint in &problem.constraints {
            description.push_str(&format!("- {constraint}\n"));
        }
    }

    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Example, StarterCode};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn problem(id: &str, difficulty: Difficulty) -> Problem {
        Problem {
            id: id.to_string(),
            title: format!("Title {id}"),
            difficulty,
            category: "Arrays".to_string(),
            description: "Do the thing.".to_string(),
            examples: vec![],
            constraints: vec![],
            hints: vec!["think".to_string()],
            starter_code: StarterCode {
                python: format!("# {id}"),
                javascript: format!("// {id}"),
                java: String::new(),
                cpp: format!("// cpp {id}"),
            },
        }
    }

    #[test]
    fn test_difficulty_mix() {
        assert_eq!(
            DifficultyMix::for_total(5),
            DifficultyMix { easy: 2, medium: 2, hard: 1 }
        );
        assert_eq!(
            DifficultyMix::for_total(1),
            DifficultyMix { easy: 1, medium: 0, hard: 0 }
        );
        assert_eq!(
            DifficultyMix::for_total(3),
            DifficultyMix { easy: 2, medium: 1, hard: 0 }
        );
        assert_eq!(
            DifficultyMix::for_total(20),
            DifficultyMix { easy: 8, medium: 8, hard: 4 }
        );
        assert_eq!(DifficultyMix::for_total(0).total(), 0);
        for total in 0..=50 {
            assert_eq!(DifficultyMix::for_total(total).total(), total);
        }
    }

    #[test]
    fn test_format_description() {
        let mut p = problem("a", Difficulty::Easy);
        p.examples = vec![Example {
            input: "x = 1".to_string(),
            output: "2".to_string(),
            explanation: Some("double it".to_string()),
        }];
        p.constraints = vec!["x > 0".to_string()];

        let formatted = format_description(&p);
        assert_eq!(
            formatted,
            "Do the thing.\n\n**Examples:**\n\nExample 1:\nInput: x = 1\nOutput: 2\nExplanation: double it\n\n\n**Constraints:**\n- x > 0\n"
        );

        let plain = format_description(&problem("b", Difficulty::Easy));
        assert_eq!(plain, "Do the thing.");
    }

    #[test]
    fn test_starter_code_lookup() {
        let catalog = ProblemCatalog::new(vec![problem("a", Difficulty::Easy)]);
        assert_eq!(catalog.starter_code("a", Language::JavaScript), "// a");
        // empty java template falls back to python
        assert_eq!(catalog.starter_code("a", Language::Java), "# a");
        assert_eq!(
            catalog.starter_code("missing", Language::Python),
            "// Problem not found: missing"
        );
        assert_eq!(catalog.hints("a"), vec!["think".to_string()]);
        assert!(catalog.hints("missing").is_empty());
    }

    #[test]
    fn test_random_problems_without_replacement() {
        let catalog = ProblemCatalog::new(vec![
            problem("e1", Difficulty::Easy),
            problem("e2", Difficulty::Easy),
            problem("m1", Difficulty::Medium),
        ]);
        let mut rng = StdRng::seed_from_u64(7);

        let easy = catalog.random_problems(&mut rng, 5, Some(Difficulty::Easy));
        assert_eq!(easy.len(), 2);
        assert_ne!(easy[0].id, easy[1].id);

        let hard = catalog.random_problems(&mut rng, 2, Some(Difficulty::Hard));
        assert!(hard.is_empty());

        let any = catalog.random_problems(&mut rng, 2, None);
        assert_eq!(any.len(), 2);
    }

    #[test]
    fn test_builtin_catalog_covers_twenty_question_sets() {
        let catalog = ProblemCatalog::builtin().unwrap();
        let mix = DifficultyMix::for_total(20);
        for &d in Difficulty::all() {
            assert!(catalog.by_difficulty(d).len() >= mix.count(d));
        }
        for p in catalog.all() {
            for &lang in Language::all() {
                assert!(!p.starter_code.get(lang).is_empty(), "{} lacks {lang}", p.id);
            }
        }
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(
            ProblemCatalog::from_json(r#"{"problems": []}"#),
            Err(Error::Catalog(_))
        ));
    }
}
