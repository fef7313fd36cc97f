use std::io::{self, Read, Write};

use html5ever::serialize::{SerializeOpts, TraversalScope};
use tracing::{debug, warn};

use crate::arena_dom::{parse_fragment, parse_fragment_bytes, Arena, Ref};
use crate::error::Result;
use crate::options::Options;
use crate::policy::Policy;
use crate::walker::Walker;

/// Upper bound on parse, walk and serialize rounds for one fragment.
const MAX_PASSES: usize = 8;

/// Parses a fragment, applies a [`Policy`] to it and serializes what is left.
///
/// The parsed tree lives in an arena owned by a single call, so one `Sanitizer` can be used
/// repeatedly, and from several threads when the policy is `Sync`.
///
/// Splicing an element out can leave a tree the HTML parser would never produce, so when a pass
/// splices anything its output is parsed and sanitized again until it comes back unchanged.
pub struct Sanitizer<'p> {
    policy: &'p dyn Policy,
}

/// Serialized result of one parse/walk round.
struct Pass {
    markup: String,
    spliced: bool,
}

impl<'p> Sanitizer<'p> {
    pub fn new(policy: &'p dyn Policy) -> Sanitizer<'p> {
        Sanitizer { policy }
    }

    /// Reads a whole fragment from `input` and writes the sanitized markup to `output`.
    ///
    /// Nothing is written until the fragment is fully sanitized.
    pub fn sanitize_fragment(&self, input: &mut impl Read, output: &mut impl Write) -> Result<()> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        let arena = typed_arena::Arena::new();
        let root = parse_fragment_bytes(&arena, &bytes);
        let markup = self.settle(self.apply(&arena, root)?)?;
        output.write_all(markup.as_bytes())?;
        Ok(())
    }

    pub fn sanitize_str(&self, markup: &str) -> Result<String> {
        self.settle(self.sanitize_once(markup)?)
    }

    fn sanitize_once(&self, markup: &str) -> Result<Pass> {
        let arena = typed_arena::Arena::new();
        let root = parse_fragment(&arena, markup);
        self.apply(&arena, root)
    }

    fn apply<'arena>(&self, arena: Arena<'arena>, root: Ref<'arena>) -> Result<Pass> {
        let spliced = Walker::new(self.policy).walk(arena, root);
        let mut output = Vec::new();
        serialize_fragment(&mut output, root)?;
        Ok(Pass {
            markup: String::from_utf8(output)?,
            spliced,
        })
    }

    /// Re-sanitizes the output of a pass that spliced until it stops changing.
    fn settle(&self, first: Pass) -> Result<String> {
        if !first.spliced {
            return Ok(first.markup);
        }

        let mut markup = first.markup;
        for pass in 2..=MAX_PASSES {
            let next = self.sanitize_once(&markup)?;
            if next.markup == markup {
                debug!(pass, "spliced markup settled");
                return Ok(markup);
            }
            markup = next.markup;
        }
        warn!(passes = MAX_PASSES, "spliced markup did not settle");
        Ok(markup)
    }
}

/// Sanitizes `markup` with the default tables, adjusted by `options`.
///
/// ```
/// use scrubber::{sanitize, Options};
///
/// let html = sanitize("<script>alert(1)</script><b>hi</b>", &Options::default()).unwrap();
/// assert_eq!(html, "<b>hi</b>");
/// ```
pub fn sanitize(markup: &str, options: &Options) -> Result<String> {
    Sanitizer::new(options).sanitize_str(markup)
}

fn serialize_fragment(output: &mut impl Write, root: Ref) -> io::Result<()> {
    html5ever::serialize(
        output,
        root,
        SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        },
    )
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::Error;
    use std::panic::{self, AssertUnwindSafe};
    use std::str;

    use crate::policy::{AttributeDecision, DefaultPolicy};

    struct MockRead {
        contents: &'static str,
    }

    impl MockRead {
        fn new(contents: &'static str) -> MockRead {
            MockRead { contents }
        }
    }

    impl Read for MockRead {
        fn read(&mut self, _: &mut [u8]) -> std::result::Result<usize, Error> {
            Ok(0)
        }

        fn read_to_end(&mut self, buf: &mut Vec<u8>) -> std::result::Result<usize, Error> {
            buf.extend_from_slice(self.contents.as_bytes());
            Ok(self.contents.len())
        }
    }

    struct FailingRead;

    impl Read for FailingRead {
        fn read(&mut self, _: &mut [u8]) -> std::result::Result<usize, Error> {
            Err(Error::new(io::ErrorKind::Other, "boom"))
        }
    }

    fn sanitize_with(options: &Options, markup: &str) -> String {
        sanitize(markup, options).unwrap()
    }

    #[test]
    fn streams_fragment_through_default_policy() {
        let sanitizer = Sanitizer::new(&DefaultPolicy);
        let mut mock_data = MockRead::new("<div><script>alert('haX0rz')</script>safe</div>");
        let mut output = vec![];
        sanitizer
            .sanitize_fragment(&mut mock_data, &mut output)
            .unwrap();
        assert_eq!(str::from_utf8(&output).unwrap(), "<div>safe</div>");
    }

    #[test]
    fn surfaces_read_errors() {
        let sanitizer = Sanitizer::new(&DefaultPolicy);
        let mut output = vec![];
        let err = sanitizer
            .sanitize_fragment(&mut FailingRead, &mut output)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
        assert!(output.is_empty());
    }

    #[test]
    fn remove_script_elements_keeping_contents() {
        let options = Options::new().remove_contents(false);
        assert_eq!(
            sanitize_with(&options, "<div><script>alert('haX0rz')</script></div>"),
            "<div>alert('haX0rz')</div>"
        );
    }

    #[test]
    fn remove_script_element_in_separate_sub_trees() {
        assert_eq!(
            sanitize_with(
                &Options::default(),
                "<div><script>alert('haX0rz')</script></div><div><script>two</script></div>"
            ),
            "<div></div><div></div>"
        );
    }

    #[test]
    fn remove_content_tag_overrides_keep_contents() {
        let options = Options::new()
            .remove_contents(false)
            .remove_content_tag(|tag| tag == "SCRIPT" || tag == "STYLE");
        assert_eq!(
            sanitize_with(
                &options,
                "<p><script>bad()</script><foo>good</foo><style>p{}</style></p>"
            ),
            "<p>good</p>"
        );
    }

    #[test]
    fn strips_event_handlers_and_unknown_attributes() {
        assert_eq!(
            sanitize_with(
                &Options::default(),
                r#"<img src="/cat.png" alt="cat" onerror="alert(1)" style="x:y">"#
            ),
            r#"<img src="/cat.png" alt="cat">"#
        );
    }

    #[test]
    fn validates_urls_per_element() {
        let options = Options::default();
        assert_eq!(
            sanitize_with(&options, r#"<a href="mailto:me@example.com">m</a>"#),
            r#"<a href="mailto:me@example.com">m</a>"#
        );
        assert_eq!(
            sanitize_with(&options, r#"<img src="mailto:me@example.com">"#),
            "<img>"
        );
        assert_eq!(
            sanitize_with(
                &options,
                r#"<blockquote cite="javascript:x()">q</blockquote><q cite="/src">q</q>"#
            ),
            r#"<blockquote>q</blockquote><q cite="/src">q</q>"#
        );
        assert_eq!(
            sanitize_with(
                &options,
                r#"<div itemscope itemtype="https://schema.org/Person">p</div>"#
            ),
            r#"<div itemscope="" itemtype="https://schema.org/Person">p</div>"#
        );
    }

    #[test]
    fn ids_kept_only_when_allowed() {
        let options = Options::new().allow_element_id(|id| id.starts_with("user-"));
        assert_eq!(
            sanitize_with(&options, r#"<p id="user-1">a</p><p id="main">b</p>"#),
            r#"<p id="user-1">a</p><p>b</p>"#
        );
    }

    #[test]
    fn link_rel_overwrites_existing_rel() {
        let options = Options::new()
            .add_link_rel(|href| {
                if href.starts_with("http") {
                    Some(vec!["noopener".to_string(), "noreferrer".to_string()])
                } else {
                    None
                }
            })
            .remove_contents(true);
        assert_eq!(
            sanitize_with(
                &options,
                r#"<a href="https://example.com" rel="me">x</a><a href="/local">y</a>"#
            ),
            r#"<a href="https://example.com" rel="noopener noreferrer">x</a><a href="/local">y</a>"#
        );
    }

    #[test]
    fn link_rel_skipped_when_href_removed() {
        let options = Options::new().add_link_rel(|_| Some(vec!["nofollow".to_string()]));
        assert_eq!(
            sanitize_with(&options, r#"<a href="javascript:x()">x</a><a>y</a>"#),
            "<a>x</a><a>y</a>"
        );
    }

    #[test]
    fn custom_tag_list_disables_link_rel() {
        let options = Options::new()
            .allow_tag(|tag| tag == "A")
            .add_link_rel(|_| Some(vec!["nofollow".to_string()]));
        assert_eq!(
            sanitize_with(&options, r#"<a href="/x">x</a><b>gone</b>"#),
            r#"<a href="/x">x</a>"#
        );
    }

    #[test]
    fn custom_attribute_policy_is_sole_authority() {
        let options = Options::new()
            .allow_element_id(|_| true)
            .allow_attribute(|tag, name, value| match (tag, name) {
                ("A", "href") => AttributeDecision::Edit(format!("/redirect?to={}", value)),
                (_, "data-x") => AttributeDecision::Unchanged,
                _ => AttributeDecision::Remove,
            });
        assert_eq!(
            sanitize_with(
                &options,
                r#"<a id="x" href="javascript:y()" data-x="1" title="t">x</a>"#
            ),
            r#"<a href="/redirect?to=javascript:y()" data-x="1">x</a>"#
        );
    }

    #[test]
    fn escapes_text_and_attribute_values() {
        assert_eq!(
            sanitize_with(&Options::default(), r#"<p title="a&quot;b">1 < 2 & 3 > 0</p>"#),
            r#"<p title="a&quot;b">1 &lt; 2 &amp; 3 &gt; 0</p>"#
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        assert_eq!(
            sanitize_with(&Options::default(), "a<br></br>b<hr/>c<wbr>"),
            "a<br><br>b<hr>c<wbr>"
        );
    }

    #[test]
    fn disallow_all_elements() {
        let options = Options::new().allow_tag(|_| false);
        assert_eq!(sanitize_with(&options, "<div><!-- keep me --></div>"), "");
    }

    #[test]
    fn spliced_markup_is_parsed_again_until_stable() {
        let options = Options::new().remove_contents(false);
        let cases = [
            (
                r#"<a href="/x">1<object><a href="/y">2</a></object></a>"#,
                r#"<a href="/x">1</a><a href="/y">2</a>"#,
            ),
            (
                "<p>a<button><p>b</p></button>c</p>",
                "<p>a</p><p>b</p>c<p></p>",
            ),
            (
                "<h1>a<marquee><h2>b</h2></marquee></h1>",
                "<h1>a</h1><h2>b</h2>",
            ),
        ];
        for &(markup, expected) in cases.iter() {
            let once = sanitize_with(&options, markup);
            assert_eq!(once, expected);
            assert_eq!(sanitize_with(&options, &once), once);
        }
    }

    #[test]
    fn streaming_output_is_settled_too() {
        let options = Options::new().remove_contents(false);
        let mut input = MockRead::new("<h1>a<marquee><h2>b</h2></marquee></h1>");
        let mut output = vec![];
        Sanitizer::new(&options)
            .sanitize_fragment(&mut input, &mut output)
            .unwrap();
        assert_eq!(str::from_utf8(&output).unwrap(), "<h1>a</h1><h2>b</h2>");
    }

    #[test]
    #[should_panic(expected = "attribute callback failed")]
    fn panicking_callback_aborts_sanitize() {
        let options = Options::new().allow_attribute(|_, _, _| panic!("attribute callback failed"));
        let _ = sanitize(r#"<p title="t">x</p>"#, &options);
    }

    #[test]
    fn panicking_callback_writes_nothing() {
        let options = Options::new().allow_tag(|tag| {
            if tag == "B" {
                panic!("tag callback failed");
            }
            true
        });
        let mut input = MockRead::new("<i>first</i><b>second</b><u>third</u>");
        let mut output = vec![];
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            Sanitizer::new(&options).sanitize_fragment(&mut input, &mut output)
        }));
        assert!(result.is_err());
        assert!(output.is_empty());
    }
}
