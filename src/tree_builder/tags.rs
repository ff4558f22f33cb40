//! Fixed tag-classification sets (spec GLOSSARY), read-only after
//! initialization the way the teacher's `declare_tag_set!`-generated
//! predicates are (§5 "Shared global state... fixed small sets of tag
//! classifications").

pub const FORMATTING: &[&str] = &[
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt",
    "u",
];

pub const CLOSE_P_ON_START: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "details", "dialog", "dir", "div",
    "dl", "fieldset", "figcaption", "figure", "footer", "form", "hgroup", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hr", "listing", "main", "menu", "nav", "ol", "p", "pre", "section",
    "search", "summary", "ul",
];

pub const BREAKOUT: &[&str] = &[
    "b", "big", "blockquote", "body", "br", "center", "code", "dd", "div", "dl", "dt", "em",
    "embed", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "i", "img", "li", "listing", "menu",
    "meta", "nobr", "ol", "p", "pre", "ruby", "s", "small", "span", "strong", "strike", "sub",
    "sup", "table", "tt", "u", "ul", "var",
];

pub const HEAD_TAGS: &[&str] = &["base", "link", "meta", "noscript", "script", "style", "template", "title"];

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

pub const TABLE_SCOPE_END_TAGS: &[&str] = &[
    "table", "tbody", "thead", "tfoot", "tr", "td", "th", "caption", "colgroup",
];

pub const TABLE_SECTION: &[&str] = &["tbody", "thead", "tfoot"];
pub const TABLE_CHILD: &[&str] = &["caption", "colgroup", "tbody", "tfoot", "thead", "tr", "td", "th"];

/// Camel-case restoration for SVG tag names (§4.3 "adjust SVG tag names"):
/// the tokenizer/`make_element` lower-cases every incoming tag name, so an
/// element like `foreignObject` would otherwise be stored (and matched
/// against, e.g. by `at_integration_point`) as `foreignobject`. Mirrors the
/// teacher lineage's `adjust_svg_tag_name` table.
pub const SVG_TAG_NAME_ADJUSTMENTS: &[(&str, &str)] = &[
    ("altglyph", "altGlyph"),
    ("altglyphdef", "altGlyphDef"),
    ("altglyphitem", "altGlyphItem"),
    ("animatecolor", "animateColor"),
    ("animatemotion", "animateMotion"),
    ("animatetransform", "animateTransform"),
    ("clippath", "clipPath"),
    ("feblend", "feBlend"),
    ("fecolormatrix", "feColorMatrix"),
    ("fecomponenttransfer", "feComponentTransfer"),
    ("fecomposite", "feComposite"),
    ("feconvolvematrix", "feConvolveMatrix"),
    ("fediffuselighting", "feDiffuseLighting"),
    ("fedisplacementmap", "feDisplacementMap"),
    ("fedistantlight", "feDistantLight"),
    ("fedropshadow", "feDropShadow"),
    ("feflood", "feFlood"),
    ("fefunca", "feFuncA"),
    ("fefuncb", "feFuncB"),
    ("fefuncg", "feFuncG"),
    ("fefuncr", "feFuncR"),
    ("fegaussianblur", "feGaussianBlur"),
    ("feimage", "feImage"),
    ("femerge", "feMerge"),
    ("femergenode", "feMergeNode"),
    ("femorphology", "feMorphology"),
    ("feoffset", "feOffset"),
    ("fepointlight", "fePointLight"),
    ("fespecularlighting", "feSpecularLighting"),
    ("fespotlight", "feSpotLight"),
    ("fetile", "feTile"),
    ("feturbulence", "feTurbulence"),
    ("foreignobject", "foreignObject"),
    ("glyphref", "glyphRef"),
    ("lineargradient", "linearGradient"),
    ("radialgradient", "radialGradient"),
    ("textpath", "textPath"),
];

/// Looks up the camel-case spelling for a lower-cased SVG tag name, if one
/// of the known mixed-case SVG elements has that lower-case form.
pub fn adjust_svg_tag_name(lower: &str) -> Option<&'static str> {
    SVG_TAG_NAME_ADJUSTMENTS
        .iter()
        .find(|&&(k, _)| k == lower)
        .map(|&(_, v)| v)
}

pub fn contains(set: &[&str], name: &str) -> bool {
    set.contains(&name)
}
