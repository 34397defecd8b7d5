//! Prompt construction and reply parsing for answer generation.

use crate::language::QueryLanguage;
use crate::types::{Answer, AssembledContext};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const RELATED_HEADING: &str = "Related questions:";
const RELATED_HEADING_AR: &str = "أسئلة ذات صلة:";

/// Upper bound on suggested follow-up questions.
pub const MAX_RELATED_QUESTIONS: usize = 3;

/// Renders the context block the generator cites from, one labelled
/// article per paragraph.
pub fn render_context(context: &AssembledContext) -> String {
    context
        .entries
        .iter()
        .map(|entry| format!("[Article {}]\n{}", entry.article_ref, entry.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_system_prompt(definitions: &str) -> String {
    format!(
        "You are a legal assistant answering questions about the Egyptian Labor Law. \
         You answer strictly from the statute excerpts supplied with each question.\n\n\
         REFERENCE DEFINITIONS:\n{}",
        definitions
    )
}

pub fn build_user_prompt(
    query: &str,
    language: QueryLanguage,
    context: &AssembledContext,
) -> String {
    format!(
        "RELEVANT ARTICLES:\n{}\n\nUSER QUERY:\n{}\n\nINSTRUCTIONS:\n\
         1. Answer using only the articles above.\n\
         2. Cite supporting articles with their [Article N] labels exactly as written.\n\
         3. Do not invent articles, numbers, or provisions that are not shown.\n\
         4. Answer in {}.\n\
         5. If the articles do not contain the answer, reply exactly: {}\n\
         6. End with the heading \"{}\" followed by exactly {} \"- \" bullets suggesting natural follow-up questions.",
        render_context(context),
        query,
        language.name(),
        language.no_information_message(),
        RELATED_HEADING,
        MAX_RELATED_QUESTIONS,
    )
}

/// Splits a raw generator reply into the answer body and the related
/// questions trailing it.
///
/// Everything before the related-questions heading is the body; bullet
/// lines after it become questions, capped at [`MAX_RELATED_QUESTIONS`].
/// A reply without the heading is all body.
pub fn parse_answer(raw: &str) -> Answer {
    let mut body_lines: Vec<&str> = Vec::new();
    let mut questions: Vec<String> = Vec::new();
    let mut in_related = false;

    for line in raw.lines() {
        if in_related {
            if questions.len() >= MAX_RELATED_QUESTIONS {
                break;
            }
            if let Some(question) = strip_bullet(line) {
                if !question.is_empty() {
                    questions.push(question.to_string());
                }
            }
            continue;
        }
        if is_related_heading(line) {
            in_related = true;
            continue;
        }
        body_lines.push(line);
    }

    Answer {
        text: body_lines.join("\n").trim().to_string(),
        related_questions: questions,
    }
}

static CITATION_PATTERN: OnceLock<Regex> = OnceLock::new();

/// The compiled `[Article N]` matcher, built once on first use.
fn citation_pattern() -> &'static Regex {
    CITATION_PATTERN.get_or_init(|| Regex::new(r"\[Article\s+([^\]]+)\]").unwrap())
}

/// Returns article references cited in the answer that are absent from
/// the supplied context, deduplicated in citation order.
pub fn verify_citations(answer_text: &str, context: &AssembledContext) -> Vec<String> {
    let known: HashSet<&str> = context
        .entries
        .iter()
        .map(|entry| entry.article_ref.as_str())
        .collect();

    let mut unknown = Vec::new();
    let mut reported: HashSet<String> = HashSet::new();
    for capture in citation_pattern().captures_iter(answer_text) {
        if let Some(reference) = capture.get(1) {
            let reference = reference.as_str().trim();
            if !known.contains(reference) && reported.insert(reference.to_string()) {
                unknown.push(reference.to_string());
            }
        }
    }
    unknown
}

fn is_related_heading(line: &str) -> bool {
    let stripped = line.trim().trim_start_matches(['#', '*']).trim_start();
    stripped.to_lowercase().starts_with("related questions")
        || stripped.starts_with(RELATED_HEADING_AR.trim_end_matches(':'))
}

fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    for prefix in ["- ", "* ", "• "] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return Some(rest.trim());
        }
    }
    None
}
