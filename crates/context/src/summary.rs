//! Heuristic chapter summaries.
//!
//! Used when a chapter has no stored summary and the manifest needs one.

use serde::{Deserialize, Serialize};

const CHAPTER_SUMMARY_CHARS: usize = 600;
const SCENE_SUMMARY_CHARS: usize = 150;
const CANON_CANDIDATE_CHARS: usize = 90;
const MAX_SCENES: usize = 3;

/// Paragraphs mentioning a character are preferred in the chapter summary.
const CHARACTER_MARKERS: [&str; 3] = ["林秋", "他", "她"];
const QUESTION_MARKERS: [&str; 3] = ["?", "？", "是否"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub scene_id: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonCandidate {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummaries {
    pub chapter_summary: String,
    pub scene_summaries: Vec<SceneSummary>,
    pub open_questions: Vec<String>,
    pub canon_candidates: Vec<CanonCandidate>,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub fn make_summaries(text: &str) -> ChapterSummaries {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
        .collect();

    let (Some(first), Some(last)) = (paragraphs.first(), paragraphs.last()) else {
        return ChapterSummaries::default();
    };

    let mut parts = vec![*first];
    parts.extend(
        paragraphs
            .iter()
            .copied()
            .filter(|p| CHARACTER_MARKERS.iter().any(|m| p.contains(m)))
            .take(2),
    );
    parts.push(*last);
    let chapter_summary = truncate_chars(&parts.join("；"), CHAPTER_SUMMARY_CHARS);

    let scene_summaries: Vec<SceneSummary> = paragraphs
        .iter()
        .take(MAX_SCENES)
        .enumerate()
        .map(|(i, p)| SceneSummary {
            scene_id: format!("scene_{}", i + 1),
            summary: truncate_chars(p, SCENE_SUMMARY_CHARS),
        })
        .collect();

    let open_questions = if QUESTION_MARKERS.iter().any(|m| text.contains(m)) {
        vec!["关键抉择尚未完全揭示后果".to_string()]
    } else {
        Vec::new()
    };

    let canon_candidates = scene_summaries
        .iter()
        .map(|s| CanonCandidate {
            kind: "event".into(),
            text: truncate_chars(&s.summary, CANON_CANDIDATE_CHARS),
        })
        .collect();

    ChapterSummaries {
        chapter_summary,
        scene_summaries,
        open_questions,
        canon_candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chapter_has_empty_summaries() {
        assert_eq!(make_summaries("# Chapter 001\n\n"), ChapterSummaries::default());
    }

    #[test]
    fn headings_are_skipped() {
        let s = make_summaries("# Chapter 001\n\n林秋在雨夜收到匿名短信。");
        assert_eq!(s.chapter_summary, "林秋在雨夜收到匿名短信。；林秋在雨夜收到匿名短信。；林秋在雨夜收到匿名短信。");
        assert_eq!(s.scene_summaries.len(), 1);
        assert_eq!(s.scene_summaries[0].scene_id, "scene_1");
    }

    #[test]
    fn summary_joins_first_named_and_last() {
        let text = "雨停了。\n\n港口很安静。\n\n她推开门。\n\n他没有回头。\n\n他们走远了。\n\n灯灭了。";
        let s = make_summaries(text);
        assert_eq!(s.chapter_summary, "雨停了。；她推开门。；他没有回头。；灯灭了。");
        let ids: Vec<_> = s.scene_summaries.iter().map(|x| x.scene_id.as_str()).collect();
        assert_eq!(ids, vec!["scene_1", "scene_2", "scene_3"]);
        assert!(s.open_questions.is_empty());
        assert_eq!(s.canon_candidates.len(), 3);
        assert_eq!(s.canon_candidates[0].kind, "event");
    }

    #[test]
    fn questions_are_noticed() {
        let s = make_summaries("她是否该回复？");
        assert_eq!(s.open_questions, vec!["关键抉择尚未完全揭示后果"]);
    }

    #[test]
    fn long_paragraphs_are_truncated_by_chars() {
        let long = "雨".repeat(1000);
        let s = make_summaries(&long);
        assert_eq!(s.chapter_summary.chars().count(), 600);
        assert_eq!(s.scene_summaries[0].summary.chars().count(), 150);
        assert_eq!(s.canon_candidates[0].text.chars().count(), 90);
    }
}
