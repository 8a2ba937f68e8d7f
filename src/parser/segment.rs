use std::ops::Range;

use crate::parser::{Span, SpanKind, Tag, PICTURE_ICON, PICTURE_MARKER};

// ── Segmenter ─────────────────────────────────────────────────────────────────

/// Split (normalized) transcript text into ordered spans.
///
/// Scans left to right for whichever comes first: a picture marker or an open
/// delimiter. A picture wins when both start at the same place. Text between
/// matches becomes an untagged span when it holds no markup.
///
/// Every search position only moves forward, so a call is linear in the
/// length of `text`.
pub fn segment(text: &str, is_streaming: bool) -> Vec<Span> {
    Scanner::new(text, is_streaming).run()
}

struct Scanner<'a> {
    text: &'a str,
    is_streaming: bool,
    /// Start of text not yet covered by any span.
    gap_start: usize,
    /// Where the next search begins; runs ahead of `gap_start` past literal delimiters.
    cursor: usize,
    /// One per entry of [`Tag::ALL`].
    opens: [Needle; 4],
    closes: [Needle; 4],
    pictures: PictureFinder,
    spans: Vec<Span>,
}

enum Hit {
    Picture(Picture),
    Open { slot: usize, at: usize },
}

#[derive(Debug, Clone, PartialEq)]
struct Picture {
    /// Byte offset of the marker (or of its icon).
    start: usize,
    /// Byte offset just past the URL.
    end: usize,
    url: Range<usize>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, is_streaming: bool) -> Self {
        Self {
            text,
            is_streaming,
            gap_start: 0,
            cursor: 0,
            opens: Tag::ALL.map(|tag| Needle::new(tag.open())),
            closes: Tag::ALL.map(|tag| Needle::new(tag.close())),
            pictures: PictureFinder::default(),
            spans: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Span> {
        while let Some(hit) = self.next_hit() {
            match hit {
                Hit::Picture(picture) => {
                    self.push_gap(picture.start);
                    self.spans.push(Span::new(SpanKind::Picture, &self.text[picture.url]));
                    self.advance_to(picture.end);
                }
                Hit::Open { slot, at } => {
                    let tag = Tag::ALL[slot];
                    let body = at + tag.open().len();
                    match self.closes[slot].find(self.text, body) {
                        Some(close_at) => {
                            self.push_gap(at);
                            push_tagged(&mut self.spans, tag.span_kind(), &self.text[body..close_at], true);
                            self.advance_to(close_at + tag.close().len());
                        }
                        None if self.is_streaming => {
                            // Still arriving: everything after the delimiter belongs to it.
                            self.push_gap(at);
                            push_tagged(&mut self.spans, tag.span_kind(), &self.text[body..], false);
                            self.advance_to(self.text.len());
                        }
                        None => {
                            // Unclosed outside a stream: the delimiter stays literal text.
                            self.cursor = body;
                        }
                    }
                }
            }
        }
        self.push_gap(self.text.len());
        self.spans
    }

    fn advance_to(&mut self, pos: usize) {
        self.gap_start = pos;
        self.cursor = pos;
    }

    fn next_hit(&mut self) -> Option<Hit> {
        if self.cursor >= self.text.len() {
            return None;
        }
        let (text, cursor) = (self.text, self.cursor);
        let picture = self.pictures.find(text, cursor);
        let open = self
            .opens
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, needle)| needle.find(text, cursor).map(|at| (at, slot)))
            .min_by_key(|(at, _)| *at);

        match (picture, open) {
            (Some(picture), Some((at, _))) if picture.start <= at => Some(Hit::Picture(picture)),
            (_, Some((at, slot))) => Some(Hit::Open { slot, at }),
            (Some(picture), None) => Some(Hit::Picture(picture)),
            (None, None) => None,
        }
    }

    fn push_gap(&mut self, end: usize) {
        if end <= self.gap_start {
            return;
        }
        let gap = self.text[self.gap_start..end].trim();
        if gap.is_empty() {
            return;
        }
        if gap.contains(|c: char| c == '<' || c == '>') {
            tracing::trace!(len = gap.len(), "dropping gap text that carries markup");
            return;
        }
        self.spans.push(Span::new(SpanKind::Untagged, gap));
    }
}

/// Push the spans for one tag body, splitting out any pictures it contains.
fn push_tagged(spans: &mut Vec<Span>, kind: SpanKind, inner: &str, complete: bool) {
    let make = |text: &str| Span { kind, text: text.to_string(), complete };

    let mut pictures = PictureFinder::default();
    let mut from = 0;
    let mut split = false;
    while let Some(picture) = pictures.find(inner, from) {
        split = true;
        let piece = inner[from..picture.start].trim();
        if !piece.is_empty() {
            spans.push(make(piece));
        }
        spans.push(Span::new(SpanKind::Picture, &inner[picture.url]));
        from = picture.end;
    }

    if !split {
        spans.push(make(inner.trim()));
        return;
    }
    let rest = inner[from..].trim();
    if !rest.is_empty() {
        spans.push(make(rest));
    }
}

// ── Forward-only search ───────────────────────────────────────────────────────

/// Remembers where a needle next occurs. Query positions must never move
/// backwards; a cached hit is reused until the query passes it.
struct Needle {
    pattern: &'static str,
    /// Next occurrence at or after the last query, `None` once exhausted.
    next: Option<usize>,
    searched: bool,
}

impl Needle {
    fn new(pattern: &'static str) -> Self {
        Self { pattern, next: None, searched: false }
    }

    fn find(&mut self, text: &str, from: usize) -> Option<usize> {
        if self.searched && self.next.map_or(true, |at| at >= from) {
            return self.next;
        }
        self.searched = true;
        self.next = text[from..].find(self.pattern).map(|rel| from + rel);
        self.next
    }
}

// ── Picture markers ───────────────────────────────────────────────────────────

/// Next picture marker that carries a URL, resolved once per marker.
struct Marker {
    at: usize,
    /// Icon in front of the marker, as seen from the query that resolved it.
    icon: Option<usize>,
    end: usize,
    url: Range<usize>,
}

struct PictureFinder {
    marker: Needle,
    cached: Option<Marker>,
}

impl Default for PictureFinder {
    fn default() -> Self {
        Self { marker: Needle::new(PICTURE_MARKER), cached: None }
    }
}

impl PictureFinder {
    /// First picture at or after `from`. Like [`Needle::find`], `from` must not decrease.
    fn find(&mut self, text: &str, from: usize) -> Option<Picture> {
        if self.cached.as_ref().map_or(true, |m| m.at < from) {
            self.cached = self.resolve(text, from);
        }
        let marker = self.cached.as_ref()?;
        let start = marker.icon.filter(|&i| i >= from).unwrap_or(marker.at);
        Some(Picture { start, end: marker.end, url: marker.url.clone() })
    }

    fn resolve(&mut self, text: &str, from: usize) -> Option<Marker> {
        let mut search = from;
        while let Some(at) = self.marker.find(text, search) {
            let url_start = at + PICTURE_MARKER.len();
            let url_end = url_start + url_len(&text[url_start..]);
            let raw = &text[url_start..url_end];
            let url = raw.trim();
            if !url.is_empty() {
                let lead = raw.len() - raw.trim_start().len();
                let icon = icon_start(&text[from..at]).map(|i| from + i);
                let url = url_start + lead..url_start + lead + url.len();
                return Some(Marker { at, icon, end: url_end, url });
            }
            search = url_start;
        }
        None
    }
}

/// The URL runs to the end of the line, stopping early at any delimiter.
fn url_len(rest: &str) -> usize {
    rest.match_indices(|c: char| c == '\n' || c == '<')
        .find(|&(i, m)| {
            m == "\n"
                || Tag::ALL
                    .iter()
                    .any(|t| rest[i..].starts_with(t.open()) || rest[i..].starts_with(t.close()))
        })
        .map_or(rest.len(), |(i, _)| i)
}

/// Offset of a picture icon directly in front of the marker, if present.
fn icon_start(head: &str) -> Option<usize> {
    head.trim_end_matches(' ').strip_suffix(PICTURE_ICON).map(str::len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize;

    fn find_picture(text: &str, from: usize) -> Option<Picture> {
        PictureFinder::default().find(text, from)
    }

    #[test]
    fn picture_includes_icon_and_stops_at_newline() {
        let text = "intro\n📷 picture showing: /img/a.png\nmore";
        let picture = find_picture(text, 0).unwrap();
        assert_eq!(&text[picture.url.clone()], "/img/a.png");
        assert_eq!(&text[picture.start..picture.end], "📷 picture showing: /img/a.png");
    }

    #[test]
    fn picture_url_stops_at_close_delimiter() {
        let text = "picture showing: http://x/y.png</observation>";
        let picture = find_picture(text, 0).unwrap();
        assert_eq!(&text[picture.url], "http://x/y.png");
    }

    #[test]
    fn marker_without_url_is_skipped() {
        assert_eq!(find_picture("picture showing:   \nnothing", 0), None);
    }

    #[test]
    fn icon_lookback_does_not_cross_search_start() {
        let text = "📷 picture showing: a";
        let picture = find_picture(text, PICTURE_ICON.len()).unwrap();
        assert_eq!(picture.start, PICTURE_ICON.len() + 1);
    }

    #[test]
    fn gap_with_markup_is_dropped() {
        let spans = segment("<b>bold</b> <think>t</think>", false);
        assert_eq!(spans, vec![Span::new(SpanKind::Reasoning, "t")]);
    }

    #[test]
    fn unclosed_tag_outside_stream_stays_literal() {
        let spans = segment("<think>never closed <execute>x</execute>", false);
        assert_eq!(spans, vec![Span::new(SpanKind::Executing, "x")]);
    }

    #[test]
    fn residual_open_while_streaming_is_incomplete() {
        let spans = segment("<think>a</think>tail <think>b", true);
        assert_eq!(
            spans,
            vec![
                Span::new(SpanKind::Reasoning, "a"),
                Span::new(SpanKind::Untagged, "tail"),
                Span::incomplete(SpanKind::Reasoning, "b"),
            ]
        );
    }

    #[test]
    fn needle_reuses_hit_until_passed() {
        let text = "a<think>b<think>";
        let mut needle = Needle::new("<think>");
        assert_eq!(needle.find(text, 0), Some(1));
        assert_eq!(needle.find(text, 1), Some(1));
        assert_eq!(needle.find(text, 2), Some(9));
        assert_eq!(needle.find(text, 10), None);
        assert_eq!(needle.find(text, 12), None);
    }

    #[test]
    fn cached_picture_drops_icon_behind_cursor() {
        let text = "x 📷 picture showing: a.png";
        let marker = text.find(PICTURE_MARKER).unwrap();
        let mut pictures = PictureFinder::default();
        assert_eq!(pictures.find(text, 0).unwrap().start, 2);
        assert_eq!(pictures.find(text, 2).unwrap().start, 2);
        let later = pictures.find(text, marker - 1).unwrap();
        assert_eq!(later.start, marker);
        assert_eq!(&text[later.url], "a.png");
    }

    #[test]
    fn unclosed_open_inside_streamed_answer_keeps_added_close() {
        // The normalizer closes `<think>` inside the answer, and that close
        // ends up in the answer text.
        let text = normalize("<solution>x<think>y", true);
        let spans = segment(&text, true);
        assert_eq!(spans, vec![Span::new(SpanKind::Answer, "x<think>y</think>")]);
    }
}
