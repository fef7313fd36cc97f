use std::collections::{HashMap, HashSet};

use crate::url_check::{is_navigational_url, is_resource_url};

/// Checks an attribute value that is only allowed on particular elements.
pub type AttributeValidator = fn(&str) -> bool;

fn any_value(_: &str) -> bool {
    true
}

lazy_static! {
    /// Elements kept by the default policy, upper-cased.
    pub static ref ELEMENTS: HashSet<&'static str> = hashset! {
        "A",
        "ABBR",
        "ACRONYM",
        "ADDRESS",
        "ARTICLE",
        "ASIDE",
        "B",
        "BDI",
        "BDO",
        "BIG",
        "BLOCKQUOTE",
        "BR",
        "CAPTION",
        "CENTER",
        "CITE",
        "CODE",
        "COL",
        "COLGROUP",
        "DATA",
        "DD",
        "DEL",
        "DETAILS",
        "DFN",
        "DIV",
        "DL",
        "DT",
        "EM",
        "FIGCAPTION",
        "FIGURE",
        "FOOTER",
        "H1",
        "H2",
        "H3",
        "H4",
        "H5",
        "H6",
        "HEADER",
        "HGROUP",
        "HR",
        "I",
        "IMG",
        "INS",
        "KBD",
        "LI",
        "MAIN",
        "MARK",
        "NAV",
        "OL",
        "P",
        "PRE",
        "Q",
        "RP",
        "RT",
        "RUBY",
        "S",
        "SAMP",
        "SECTION",
        "SMALL",
        "SPAN",
        "STRIKE",
        "STRONG",
        "SUB",
        "SUMMARY",
        "SUP",
        "TABLE",
        "TBODY",
        "TD",
        "TFOOT",
        "TH",
        "THEAD",
        "TIME",
        "TR",
        "TT",
        "U",
        "UL",
        "VAR",
        "WBR",
    };

    /// Attributes kept on any allowed element, lower-cased. Event handlers are absent.
    pub static ref ALL_ATTRIBUTES: HashSet<&'static str> = hashset! {
        "abbr",
        "align",
        "alt",
        "aria-activedescendant",
        "aria-atomic",
        "aria-autocomplete",
        "aria-busy",
        "aria-checked",
        "aria-colcount",
        "aria-colindex",
        "aria-colspan",
        "aria-controls",
        "aria-current",
        "aria-describedby",
        "aria-details",
        "aria-disabled",
        "aria-expanded",
        "aria-haspopup",
        "aria-hidden",
        "aria-invalid",
        "aria-label",
        "aria-labelledby",
        "aria-level",
        "aria-live",
        "aria-multiline",
        "aria-multiselectable",
        "aria-orientation",
        "aria-owns",
        "aria-posinset",
        "aria-pressed",
        "aria-readonly",
        "aria-relevant",
        "aria-required",
        "aria-roledescription",
        "aria-rowcount",
        "aria-rowindex",
        "aria-rowspan",
        "aria-selected",
        "aria-setsize",
        "aria-sort",
        "aria-valuemax",
        "aria-valuemin",
        "aria-valuenow",
        "aria-valuetext",
        "axis",
        "border",
        "cellpadding",
        "cellspacing",
        "char",
        "charoff",
        "clear",
        "colspan",
        "compact",
        "datetime",
        "dir",
        "headers",
        "height",
        "hreflang",
        "hspace",
        "label",
        "lang",
        "nowrap",
        "open",
        "reversed",
        "role",
        "rowspan",
        "rules",
        "scope",
        "span",
        "start",
        "summary",
        "title",
        "type",
        "valign",
        "value",
        "vspace",
        "width",
    };

    /// Extra attributes allowed only on a given element, each with the check its value must pass.
    pub static ref ATTRIBUTES: HashMap<&'static str, HashMap<&'static str, AttributeValidator>> = hashmap! {
        "A" => hashmap! {
            "href" => is_navigational_url as AttributeValidator,
        },
        "BLOCKQUOTE" => hashmap! {
            "cite" => is_resource_url as AttributeValidator,
        },
        "DEL" => hashmap! {
            "cite" => is_resource_url as AttributeValidator,
        },
        "DIV" => hashmap! {
            "itemscope" => any_value as AttributeValidator,
            "itemtype" => any_value as AttributeValidator,
        },
        "IMG" => hashmap! {
            "longdesc" => is_resource_url as AttributeValidator,
            "src" => is_resource_url as AttributeValidator,
        },
        "INS" => hashmap! {
            "cite" => is_resource_url as AttributeValidator,
        },
        "Q" => hashmap! {
            "cite" => is_resource_url as AttributeValidator,
        },
    };
}

pub fn is_allowed_element(tag: &str) -> bool {
    ELEMENTS.contains(tag.to_ascii_uppercase().as_str())
}

pub fn is_global_attribute(name: &str) -> bool {
    ALL_ATTRIBUTES.contains(name.to_ascii_lowercase().as_str())
}

/// Looks up the validator for `name` on `tag`, if that pairing is allowed at all.
pub fn attribute_validator(tag: &str, name: &str) -> Option<AttributeValidator> {
    ATTRIBUTES
        .get(tag.to_ascii_uppercase().as_str())
        .and_then(|attributes| attributes.get(name.to_ascii_lowercase().as_str()))
        .copied()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn excludes_scripting_forms_frames_and_styling() {
        for tag in &[
            "SCRIPT", "STYLE", "IFRAME", "FRAME", "FRAMESET", "FORM", "INPUT", "BUTTON",
            "TEXTAREA", "SELECT", "OBJECT", "EMBED", "LINK", "META", "BASE", "SVG", "MATH",
            "TEMPLATE", "NOSCRIPT",
        ] {
            assert!(!is_allowed_element(tag), "{} should not be allowed", tag);
        }
    }

    #[test]
    fn element_lookup_ignores_case() {
        assert!(is_allowed_element("blockquote"));
        assert!(is_allowed_element("Blockquote"));
        assert!(is_allowed_element("H3"));
    }

    #[test]
    fn global_attributes_exclude_event_handlers_and_style() {
        assert!(is_global_attribute("alt"));
        assert!(is_global_attribute("ARIA-LABEL"));
        assert!(!is_global_attribute("onclick"));
        assert!(!is_global_attribute("onerror"));
        assert!(!is_global_attribute("style"));
        assert!(!is_global_attribute("href"));
        assert!(!is_global_attribute("id"));
        assert!(!is_global_attribute("class"));
    }

    #[test]
    fn per_element_validators() {
        let href = attribute_validator("a", "HREF").unwrap();
        assert!(href("mailto:someone@example.com"));
        assert!(!href("javascript:alert(1)"));

        let src = attribute_validator("IMG", "src").unwrap();
        assert!(src("/images/cat.png"));
        assert!(!src("mailto:someone@example.com"));

        for tag in &["BLOCKQUOTE", "DEL", "INS", "Q"] {
            assert!(attribute_validator(tag, "cite").is_some());
        }

        assert!(attribute_validator("DIV", "itemscope").unwrap()(""));
        assert!(attribute_validator("DIV", "itemtype").unwrap()("https://schema.org/Thing"));
        assert!(attribute_validator("SPAN", "href").is_none());
        assert!(attribute_validator("A", "src").is_none());
    }
}
