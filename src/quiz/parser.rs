//! Tolerant parser for hand-written quiz text.
//!
//! Accepts blocks like
//!
//! ```text
//! 1. What is 2+2?
//! a) 3
//! b) 4 ✅
//! (c) 5
//! Ex: Basic arithmetic.
//! ```
//!
//! Questions may be numbered (`1.`, `24)`, `3 -`) or bare, as long as a bare
//! question is directly followed by lettered options. The option carrying a
//! checkmark is the correct one, defaulting to the first option. Blocks that
//! don't make a valid quiz are skipped.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::quiz::{QuizRecord, MAX_OPTIONS};

static NUMBERED_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)\-\s]+").expect("numbered question pattern"));
static QUESTION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)\-\s]*").expect("question number pattern"));
static OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[(\[]?[A-Da-d][)\].\-\s]+(.*)$").expect("option pattern")
});
static EXPLANATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:Ex:|Explain:|Explanation:)\s*").expect("explanation pattern")
});

const CHECKMARKS: [char; 2] = ['✅', '✔'];
// Emoji presentation selector, as in "✔️".
const VARIATION_SELECTOR: char = '\u{FE0F}';

/// Converts CRLF and lone CR line endings to LF.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Parses every quiz block found in `text`, in source order.
pub fn parse<'a>(text: impl Into<Option<&'a str>>) -> Vec<QuizRecord> {
    let text = match text.into() {
        Some(text) if !text.is_empty() => text,
        _ => return Vec::new(),
    };

    let normalized = normalize_line_endings(text);
    let lines: Vec<&str> = normalized.split('\n').map(str::trim_end).collect();

    let mut scanner = Scanner::new(&lines);
    let mut phase = Phase::Seeking;
    let mut quizzes = Vec::new();
    loop {
        phase = match phase {
            Phase::Seeking if scanner.at_end() => break,
            Phase::Seeking => scanner.seek(),
            Phase::Question(block) => scanner.accumulate_question(block),
            Phase::Options(block) => scanner.collect_options(block),
            Phase::Explanation(block) => scanner.collect_explanation(block),
            Phase::Finalize(block) => {
                let start = block.start_line;
                match block.build() {
                    Ok(quiz) => quizzes.push(quiz),
                    Err(err) => debug!("Skipping quiz block at line {}: {}", start + 1, err),
                }
                Phase::Seeking
            }
        };
    }
    quizzes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// `1. ...`; `rest` is the text after the number and its punctuation.
    Numbered { rest: &'a str },
    Option { text: &'a str },
    Explanation { text: &'a str },
    Text,
}

/// Classifies a single line. The variants don't overlap: a numbered line starts
/// with a digit, an option with a letter A-D or a bracket, and no explanation
/// marker starts with A-D.
pub fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if NUMBERED_QUESTION.is_match(line) {
        let rest = QUESTION_NUMBER
            .find(line)
            .map_or(line, |number| &line[number.end()..]);
        return LineKind::Numbered { rest: rest.trim() };
    }
    if let Some(caps) = OPTION.captures(line) {
        let text = caps.get(1).map_or("", |m| m.as_str()).trim();
        return LineKind::Option { text };
    }
    if let Some(marker) = EXPLANATION_MARKER.find(line) {
        return LineKind::Explanation {
            text: line[marker.end()..].trim(),
        };
    }
    LineKind::Text
}

pub fn is_option(line: &str) -> bool {
    matches!(classify(line), LineKind::Option { .. })
}

enum Phase {
    Seeking,
    Question(BlockBuilder),
    Options(BlockBuilder),
    Explanation(BlockBuilder),
    Finalize(BlockBuilder),
}

struct BlockBuilder {
    start_line: usize,
    question: String,
    options: Vec<String>,
    correct: Option<usize>,
    explanation: String,
}

impl BlockBuilder {
    fn new(start_line: usize, question: &str) -> Self {
        Self {
            start_line,
            question: question.to_string(),
            options: Vec::new(),
            correct: None,
            explanation: String::new(),
        }
    }

    fn push_option(&mut self, text: &str) {
        let (text, marked) = strip_checkmarks(text);
        if marked && self.correct.is_none() {
            self.correct = Some(self.options.len());
        }
        self.options.push(text);
    }

    fn build(self) -> Result<QuizRecord, crate::quiz::QuizError> {
        QuizRecord::new(
            &self.question,
            self.options,
            self.correct.unwrap_or(0),
            &self.explanation,
        )
    }
}

/// Removes every checkmark glyph, reporting whether there was one.
fn strip_checkmarks(text: &str) -> (String, bool) {
    if !text.contains(&CHECKMARKS[..]) {
        return (text.to_string(), false);
    }
    let mut stripped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if CHECKMARKS.contains(&c) {
            if chars.peek() == Some(&VARIATION_SELECTOR) {
                chars.next();
            }
            continue;
        }
        stripped.push(c);
    }
    (stripped.trim().to_string(), true)
}

/// Forward-only cursor over the right-trimmed input lines.
struct Scanner<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        Self { lines, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn current(&self) -> LineKind<'a> {
        self.lines
            .get(self.pos)
            .copied()
            .map_or(LineKind::Blank, classify)
    }

    fn next_non_blank(&self) -> Option<&'a str> {
        self.lines[self.pos + 1..]
            .iter()
            .copied()
            .find(|line| !line.trim().is_empty())
    }

    /// Skips blank and stray lines until a question starts, one line per call.
    fn seek(&mut self) -> Phase {
        let line = self.lines[self.pos];
        let start = self.pos;
        match classify(line) {
            LineKind::Blank => {
                self.pos += 1;
                Phase::Seeking
            }
            LineKind::Numbered { rest } => {
                self.pos += 1;
                Phase::Question(BlockBuilder::new(start, rest))
            }
            _ if self.next_non_blank().is_some_and(is_option) => {
                self.pos += 1;
                Phase::Question(BlockBuilder::new(start, line.trim()))
            }
            _ => {
                self.pos += 1;
                Phase::Seeking
            }
        }
    }

    /// Joins continuation lines until a blank line, an option or an explanation.
    fn accumulate_question(&mut self, mut block: BlockBuilder) -> Phase {
        while !self.at_end() {
            match self.current() {
                LineKind::Blank | LineKind::Option { .. } | LineKind::Explanation { .. } => break,
                _ => {
                    block.question.push(' ');
                    block.question.push_str(self.lines[self.pos].trim());
                    self.pos += 1;
                }
            }
        }
        Phase::Options(block)
    }

    fn collect_options(&mut self, mut block: BlockBuilder) -> Phase {
        while block.options.len() < MAX_OPTIONS {
            match self.current() {
                LineKind::Option { text } => {
                    block.push_option(text);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        Phase::Explanation(block)
    }

    /// Optional explanation, continuing over lines that don't start a new block.
    fn collect_explanation(&mut self, mut block: BlockBuilder) -> Phase {
        let LineKind::Explanation { text } = self.current() else {
            return Phase::Finalize(block);
        };
        block.explanation.push_str(text);
        self.pos += 1;

        while !self.at_end() {
            match self.current() {
                LineKind::Blank | LineKind::Numbered { .. } | LineKind::Option { .. } => break,
                _ => {
                    block.explanation.push(' ');
                    block.explanation.push_str(self.lines[self.pos].trim());
                    self.pos += 1;
                }
            }
        }
        Phase::Finalize(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::TRUNCATION_MARKER;
    use pretty_assertions::assert_eq;

    fn strings(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn parses_basic_block() {
        let quizzes = parse("1. What is 2+2?\na) 3\nb) 4 ✅\nc) 5\nEx: Basic arithmetic.");
        assert_eq!(quizzes.len(), 1);
        let quiz = &quizzes[0];
        assert_eq!(quiz.question(), "What is 2+2?");
        assert_eq!(quiz.options(), strings(&["3", "4", "5"]).as_slice());
        assert_eq!(quiz.correct_index(), 1);
        assert_eq!(quiz.explanation(), "Basic arithmetic.");
    }

    #[test]
    fn empty_and_absent_input_yield_nothing() {
        assert!(parse("").is_empty());
        assert!(parse(None::<&str>).is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn normalization_is_idempotent() {
        let text = "a\r\nb\rc\n\r\nd";
        let once = normalize_line_endings(text);
        assert_eq!(once, "a\nb\nc\n\nd");
        assert_eq!(normalize_line_endings(&once), once);
    }

    #[test]
    fn handles_windows_line_endings() {
        let quizzes = parse("1. Q?\r\na) x\r\nb) y ✅\r\n");
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].options(), strings(&["x", "y"]).as_slice());
        assert_eq!(quizzes[0].correct_index(), 1);
    }

    #[test]
    fn keeps_source_order_across_blocks() {
        let text = "1. First?\na) x\nb) y\n\n2) Second?\na) x\nb) y\n\n3 - Third?\na) x\nb) y";
        let questions: Vec<String> = parse(text)
            .iter()
            .map(|q| q.question().to_string())
            .collect();
        assert_eq!(questions, strings(&["First?", "Second?", "Third?"]));
    }

    #[test]
    fn two_blocks_are_validated_independently() {
        let text = "1. What is 2+2?\na) 3\nb) 4 ✅\nc) 5\nEx: Basic arithmetic.\n\n\
                    2. Capital of France?\na) Paris ✔\nb) Rome";
        let quizzes = parse(text);
        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[1].question(), "Capital of France?");
        assert_eq!(quizzes[1].correct_index(), 0);
        assert_eq!(quizzes[1].explanation(), "");
    }

    #[test]
    fn bare_question_followed_by_options() {
        let quizzes = parse("Which planet is red?\n(A) Venus\n(B) Mars ✅");
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].question(), "Which planet is red?");
        assert_eq!(quizzes[0].options(), strings(&["Venus", "Mars"]).as_slice());
        assert_eq!(quizzes[0].correct_index(), 1);
    }

    #[test]
    fn blank_line_before_options_breaks_the_block() {
        assert!(parse("Which planet is red?\n\n(A) Venus\n(B) Mars ✅").is_empty());
    }

    #[test]
    fn stray_text_between_blocks_is_dropped() {
        let text = "Here are today's questions\nGood luck!\n\n1. Q?\na) x\nb) y";
        let quizzes = parse(text);
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].question(), "Q?");
    }

    #[test]
    fn question_spans_several_lines() {
        let quizzes = parse("1. Which of these\nis a prime\nnumber?\nA. 4\nB. 7 ✅");
        assert_eq!(quizzes[0].question(), "Which of these is a prime number?");
    }

    #[test]
    fn accepts_many_option_styles() {
        let quizzes = parse("1. Q?\na) one\n(B) two\n[c] three\nD. four\n");
        assert_eq!(
            quizzes[0].options(),
            strings(&["one", "two", "three", "four"]).as_slice()
        );
    }

    #[test]
    fn first_checkmark_wins_and_all_are_stripped() {
        let quizzes = parse("1. Q?\na) x\nb) ✅ y\nc) z ✔\nd) w");
        assert_eq!(quizzes[0].correct_index(), 1);
        assert_eq!(quizzes[0].options(), strings(&["x", "y", "z", "w"]).as_slice());
    }

    #[test]
    fn emoji_checkmark_variant_is_stripped() {
        let quizzes = parse("1. Q?\na) x\nb) y ✔️");
        assert_eq!(quizzes[0].options(), strings(&["x", "y"]).as_slice());
        assert_eq!(quizzes[0].correct_index(), 1);
    }

    #[test]
    fn defaults_to_first_option_without_checkmark() {
        let quizzes = parse("1. Q?\na) x\nb) y\nc) z");
        assert_eq!(quizzes[0].correct_index(), 0);
    }

    #[test]
    fn single_option_block_is_discarded() {
        let quizzes = parse("1. Lonely?\na) only\nEx: nothing else\n\n2. Fine?\na) x\nb) y");
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].question(), "Fine?");
    }

    #[test]
    fn empty_numbered_question_is_discarded() {
        let quizzes = parse("1.\na) x\nb) y\n\n2. Real?\na) x\nb) y");
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].question(), "Real?");
    }

    #[test]
    fn multi_line_explanation_stops_at_next_question() {
        let text = "1. Q?\na) x\nb) y\nExplanation: first part\nsecond part\n2. Next?\na) x\nb) y";
        let quizzes = parse(text);
        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[0].explanation(), "first part second part");
        assert_eq!(quizzes[1].question(), "Next?");
    }

    #[test]
    fn blank_line_ends_explanation() {
        let text = "1. Q?\na) x\nb) y\nEx: first\n\nstray note\n2. Next?\na) x\nb) y";
        let quizzes = parse(text);
        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[0].explanation(), "first");
        assert_eq!(quizzes[1].question(), "Next?");
    }

    #[test]
    fn option_line_ends_explanation_and_starts_new_block() {
        let text = "1. Q?\na) x\nb) y\nEx: why\nc) Second?\na) one\nb) two ✅";
        let quizzes = parse(text);
        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[0].explanation(), "why");
        assert_eq!(quizzes[0].options(), strings(&["x", "y"]).as_slice());
        assert_eq!(quizzes[1].question(), "c) Second?");
        assert_eq!(quizzes[1].options(), strings(&["one", "two"]).as_slice());
        assert_eq!(quizzes[1].correct_index(), 1);
    }

    #[test]
    fn second_explanation_marker_is_kept_as_text() {
        let quizzes = parse("1. Q?\na) x\nb) y\nEx: first\nExplanation: second");
        assert_eq!(quizzes[0].explanation(), "first Explanation: second");
    }

    #[test]
    fn explanation_marker_is_case_insensitive() {
        let quizzes = parse("1. Q?\na) x\nb) y\nEXPLAIN:   because");
        assert_eq!(quizzes[0].explanation(), "because");
    }

    #[test]
    fn at_most_ten_options_are_collected() {
        let mut text = String::from("1. Q?\n");
        for i in 0..12 {
            let label = ['a', 'b', 'c', 'd'][i % 4];
            text.push_str(&format!("{}) option {}\n", label, i));
        }
        let quizzes = parse(text.as_str());
        assert!(!quizzes.is_empty());
        assert_eq!(quizzes[0].options().len(), 10);
        for quiz in &quizzes {
            assert!((2..=10).contains(&quiz.options().len()));
            assert!(quiz.correct_index() < quiz.options().len());
        }
    }

    #[test]
    fn long_question_is_truncated() {
        let text = format!("1. {}\na) x\nb) y", "q".repeat(350));
        let quizzes = parse(text.as_str());
        assert_eq!(
            quizzes[0].question(),
            format!("{}{}", "q".repeat(300), TRUNCATION_MARKER)
        );
    }

    #[test]
    fn classifies_lines() {
        assert_eq!(classify("   "), LineKind::Blank);
        assert_eq!(classify("24) Why?"), LineKind::Numbered { rest: "Why?" });
        assert_eq!(classify("3 - How?"), LineKind::Numbered { rest: "How?" });
        assert_eq!(
            classify("  (C) maybe"),
            LineKind::Option { text: "maybe" }
        );
        assert_eq!(
            classify("explanation: see above"),
            LineKind::Explanation { text: "see above" }
        );
        assert_eq!(classify("Apples are red"), LineKind::Text);
        assert!(is_option("b. x"));
        assert!(!is_option("Example"));
    }
}
