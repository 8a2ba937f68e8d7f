use std::borrow::Cow;

use crate::parser::Tag;

/// Open/close delimiter counts for one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagBalance {
    pub tag: Tag,
    pub opens: usize,
    pub closes: usize,
}

impl TagBalance {
    pub fn is_balanced(&self) -> bool {
        self.opens == self.closes
    }

    pub fn name(&self) -> &'static str {
        self.tag.open().trim_start_matches('<').trim_end_matches('>')
    }
}

/// Count every tag's delimiters, in vocabulary order.
pub fn tag_balance(text: &str) -> Vec<TagBalance> {
    Tag::ALL
        .iter()
        .map(|&tag| TagBalance {
            tag,
            opens: text.matches(tag.open()).count(),
            closes: text.matches(tag.close()).count(),
        })
        .collect()
}

/// Whether `text` contains any agent open delimiter.
pub fn has_agent_tags(text: &str) -> bool {
    Tag::ALL.iter().any(|t| text.contains(t.open()))
}

/// Close tags a stream left open.
///
/// Outside streaming the text is returned untouched. While streaming, every
/// tag with more opens than closes gets exactly one close appended, however
/// large the deficit: the stream is assumed to be inside at most one tag of a
/// kind at a time.
pub fn normalize(text: &str, is_streaming: bool) -> Cow<'_, str> {
    if !is_streaming || text.is_empty() {
        return Cow::Borrowed(text);
    }

    let mut out = Cow::Borrowed(text);
    for balance in tag_balance(text) {
        if balance.opens > balance.closes {
            tracing::trace!(tag = balance.name(), deficit = balance.opens - balance.closes, "closing dangling tag");
            out.to_mut().push_str(balance.tag.close());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_once_per_kind() {
        let out = normalize("<think>a<think>b", true);
        assert_eq!(out, "<think>a<think>b</think>");
    }

    #[test]
    fn appends_in_vocabulary_order() {
        let out = normalize("<solution>x<think>y", true);
        assert_eq!(out, "<solution>x<think>y</think></solution>");
    }

    #[test]
    fn balanced_text_is_borrowed() {
        let out = normalize("<think>a</think>", true);
        assert!(matches!(out, Cow::Borrowed(_)));
    }
}
