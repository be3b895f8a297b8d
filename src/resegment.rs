//! Marker-driven second-pass resegmentation.
//!
//! Splits transcribed segments at marker occurrences, producing the final
//! segment sequence. The split is lossless: concatenating the produced texts
//! in order reproduces each transcribed segment's text exactly. The pass is a
//! pure function of its inputs: resegmenting the same transcript twice
//! yields identical output.

use crate::defaults;
use crate::markers::catalog::MarkerCatalog;
use crate::markers::detector::{self, MarkerHit};
use crate::model::{MarkerOccurrence, Segment, TranscribedSegment};
use std::collections::HashMap;

/// Tunables for the resegmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResegmenterConfig {
    /// Minimum prefix length, in characters, for a split to happen. A marker
    /// whose prefix would be shorter attaches to the still-whole segment as
    /// metadata instead. Negative values are unrepresentable here; the
    /// config-file layer rejects them before this struct is built.
    pub min_split_prefix_chars: usize,
}

impl Default for ResegmenterConfig {
    fn default() -> Self {
        Self {
            min_split_prefix_chars: defaults::MIN_SPLIT_PREFIX_CHARS,
        }
    }
}

/// Second-pass segmenter: refines transcribed segments at marker boundaries
/// and assigns the stable, never-reused segment ids.
#[derive(Debug, Clone)]
pub struct Resegmenter {
    catalog: MarkerCatalog,
    config: ResegmenterConfig,
}

impl Resegmenter {
    pub fn new(catalog: MarkerCatalog) -> Self {
        Self::with_config(catalog, ResegmenterConfig::default())
    }

    pub fn with_config(catalog: MarkerCatalog, config: ResegmenterConfig) -> Self {
        Self { catalog, config }
    }

    /// Refines the transcribed sequence into final segments.
    ///
    /// Sub-segment timestamps are interpolated proportionally to character
    /// offset within the parent's time span. This is an approximation; true
    /// sub-segment timing would need forced alignment.
    pub fn resegment(&self, transcribed: &[TranscribedSegment]) -> Vec<Segment> {
        let mut segments = Vec::with_capacity(transcribed.len());
        let mut next_id = 1usize;

        for ts in transcribed {
            for draft in self.split_one(ts) {
                let id = format!("seg_{next_id:04}");
                next_id += 1;
                segments.push(draft.into_segment(id, ts));
            }
        }
        segments
    }

    /// Splits one transcribed segment's text at marker occurrences, honoring
    /// the minimum-prefix floor.
    fn split_one(&self, ts: &TranscribedSegment) -> Vec<PieceDraft> {
        let text = &ts.text;
        let hits = detector::detect(text, &self.catalog);
        let char_of_byte: HashMap<usize, usize> = text
            .char_indices()
            .enumerate()
            .map(|(char_idx, (byte_idx, _))| (byte_idx, char_idx))
            .collect();
        let total_chars = char_of_byte.len();

        let mut pieces = Vec::new();
        let mut current = PieceDraft::starting_at(0, 0);

        for hit in hits {
            let hit_char = char_of_byte[&hit.offset];
            let prefix_chars = hit_char - current.start_char;
            if prefix_chars >= self.config.min_split_prefix_chars.max(1) {
                current.end_byte = hit.offset;
                current.end_char = hit_char;
                pieces.push(current);
                current = PieceDraft::starting_at(hit.offset, hit_char);
            }
            // Either way the marker belongs to the current piece; a skipped
            // split leaves it at an interior offset, a taken split puts it
            // at offset 0 of the new piece.
            current.markers.push(hit);
        }
        current.end_byte = text.len();
        current.end_char = total_chars;
        pieces.push(current);
        pieces
    }
}

/// A piece of a parent segment's text, pending id assignment.
struct PieceDraft {
    start_byte: usize,
    end_byte: usize,
    start_char: usize,
    end_char: usize,
    markers: Vec<MarkerHit>,
}

impl PieceDraft {
    fn starting_at(byte: usize, ch: usize) -> Self {
        Self {
            start_byte: byte,
            end_byte: byte,
            start_char: ch,
            end_char: ch,
            markers: Vec::new(),
        }
    }

    fn into_segment(self, id: String, parent: &TranscribedSegment) -> Segment {
        let total_chars = parent.text.chars().count();
        let duration = parent.raw.duration();
        let at = |char_idx: usize| {
            if total_chars == 0 {
                parent.raw.start_time
            } else {
                parent.raw.start_time + duration * (char_idx as f64 / total_chars as f64)
            }
        };
        let start_time = at(self.start_char);
        let end_time = if self.end_char == total_chars {
            parent.raw.end_time
        } else {
            at(self.end_char)
        };

        let markers = self
            .markers
            .into_iter()
            .map(|hit| MarkerOccurrence {
                segment_id: id.clone(),
                offset: hit.offset - self.start_byte,
                keyword: hit.keyword,
                category: hit.category,
            })
            .collect();

        Segment {
            id,
            start_time,
            end_time,
            text: parent.text[self.start_byte..self.end_byte].to_string(),
            markers,
            topics: Vec::new(),
            importance_score: 0.5,
            is_core_argument: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AudioSpan, RawSegment, RelationType};

    fn transcribed(start: f64, end: f64, text: &str) -> TranscribedSegment {
        TranscribedSegment {
            raw: RawSegment {
                start_time: start,
                end_time: end,
                audio: AudioSpan {
                    start_sample: (start * 16000.0) as usize,
                    end_sample: (end * 16000.0) as usize,
                },
            },
            text: text.to_string(),
            confidence: 0.9,
            failed: false,
        }
    }

    fn resegmenter() -> Resegmenter {
        Resegmenter::new(MarkerCatalog::default())
    }

    fn concat(segments: &[Segment]) -> String {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn text_without_markers_is_a_noop() {
        let input = vec![
            transcribed(0.0, 5.0, "这里没有任何标记词的一句话。"),
            transcribed(5.0, 9.0, "这里同样没有。"),
        ];
        let segments = resegmenter().resegment(&input);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, input[0].text);
        assert_eq!(segments[1].text, input[1].text);
        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[0].end_time, 5.0);
    }

    #[test]
    fn splits_at_marker_with_opening_marker_recorded() {
        let input = vec![transcribed(
            0.0,
            10.0,
            "我们首先要理解哲学的本质。但是这个问题很复杂。",
        )];
        let segments = resegmenter().resegment(&input);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "我们首先要理解哲学的本质。");
        assert_eq!(segments[1].text, "但是这个问题很复杂。");
        let opening = segments[1].opening_marker().unwrap();
        assert_eq!(opening.keyword, "但是");
        assert_eq!(opening.category, RelationType::Contrast);
        assert_eq!(opening.offset, 0);
        assert!(segments[0].opening_marker().is_none());
    }

    #[test]
    fn split_is_lossless() {
        let input = vec![
            transcribed(0.0, 10.0, "先讲一点。但是有反例。所以要小心。总之如此。"),
            transcribed(10.0, 12.0, "另外一段，比如这个例子。"),
        ];
        let segments = resegmenter().resegment(&input);
        let per_parent: String = concat(&segments);
        let original: String = input.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(per_parent, original);
    }

    #[test]
    fn short_prefix_skips_split_and_attaches_marker() {
        // "但是" appears 2 chars in, below the 6-char floor, so no split.
        let input = vec![transcribed(0.0, 4.0, "好的但是我们继续讲下去。")];
        let segments = resegmenter().resegment(&input);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].markers.len(), 1);
        assert_eq!(segments[0].markers[0].keyword, "但是");
        assert_eq!(segments[0].markers[0].offset, "好的".len());
        assert!(segments[0].opening_marker().is_none());
    }

    #[test]
    fn marker_at_start_stays_whole_but_opens_segment() {
        let input = vec![transcribed(0.0, 4.0, "但是这句话以标记词开头。")];
        let segments = resegmenter().resegment(&input);
        assert_eq!(segments.len(), 1);
        let opening = segments[0].opening_marker().unwrap();
        assert_eq!(opening.keyword, "但是");
    }

    #[test]
    fn timestamps_interpolate_by_character_offset() {
        // 10 chars total, split at char 6 → boundary at 60% of the span
        let input = vec![transcribed(10.0, 20.0, "前面五个字。但是后面")];
        let segments = resegmenter().resegment(&input);
        assert_eq!(segments.len(), 2);
        assert!((segments[0].start_time - 10.0).abs() < 1e-9);
        assert!((segments[0].end_time - 16.0).abs() < 1e-9);
        assert!((segments[1].start_time - 16.0).abs() < 1e-9);
        assert!((segments[1].end_time - 20.0).abs() < 1e-9);
    }

    #[test]
    fn ids_are_sequential_across_parents() {
        let input = vec![
            transcribed(0.0, 5.0, "第一段没有标记。"),
            transcribed(5.0, 15.0, "第二段先说一点。但是有转折。"),
        ];
        let segments = resegmenter().resegment(&input);
        let ids: Vec<&str> = segments.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["seg_0001", "seg_0002", "seg_0003"]);
    }

    #[test]
    fn failed_segment_keeps_its_place_with_empty_text() {
        let mut failed = transcribed(3.0, 6.0, "");
        failed.failed = true;
        failed.confidence = 0.0;
        let input = vec![transcribed(0.0, 3.0, "有内容。"), failed];
        let segments = resegmenter().resegment(&input);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, "");
        assert_eq!(segments[1].start_time, 3.0);
        assert_eq!(segments[1].end_time, 6.0);
    }

    #[test]
    fn resegmentation_is_deterministic() {
        let input = vec![transcribed(
            0.0,
            30.0,
            "先提出问题。但是存在争议。所以需要论证。比如这个例子。总之暂且如此。",
        )];
        let r = resegmenter();
        assert_eq!(r.resegment(&input), r.resegment(&input));
    }

    #[test]
    fn marker_segment_ids_match_owner() {
        let input = vec![transcribed(0.0, 10.0, "先说一点内容。但是有反例。")];
        let segments = resegmenter().resegment(&input);
        for seg in &segments {
            for marker in &seg.markers {
                assert_eq!(marker.segment_id, seg.id);
            }
        }
    }
}
