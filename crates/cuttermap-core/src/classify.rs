//! Ordered token classification rules for BOM rows.
//!
//! Each rule is an independent predicate paired with the field it fills.
//! A token takes the first rule (in list order) whose field is still empty
//! in its row and whose predicate accepts it.

use std::sync::LazyLock;

use regex::Regex;

use crate::options::BomOptions;
use crate::words::Word;

static CUTTER_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(CT\d+\w*|WC-?MAT\d*|PMT[\w-]*|CR\d+\w*|ABS[\w-]*|CIA[\w-]*)$")
        .expect("valid regex")
});
static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}|[\d.]*MM)$").expect("valid regex"));
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,3}$").expect("valid regex"));
static CHAMFER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+C-?\d+|U-?\d*|NA|DROP-IN)$").expect("valid regex"));
static MATERIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5,}[A-Z]?\d*$").expect("valid regex"));
static FAMILY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3,}$").expect("valid regex"));

/// The BOM field a token can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CutterType,
    Size,
    Count,
    Chamfer,
    Material,
}

/// The x-centers of the BOM column labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnAnchors {
    pub size: Option<f64>,
    pub chamfer: Option<f64>,
    pub cutter_type: Option<f64>,
    pub count: Option<f64>,
    pub material: Option<f64>,
}

impl ColumnAnchors {
    pub fn len(&self) -> usize {
        [
            self.size,
            self.chamfer,
            self.cutter_type,
            self.count,
            self.material,
        ]
        .iter()
        .filter(|a| a.is_some())
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a rule may look at besides the token itself.
pub struct RuleContext<'a> {
    pub anchors: &'a ColumnAnchors,
    pub options: &'a BomOptions,
}

impl RuleContext<'_> {
    fn near(&self, word: &Word, anchor: Option<f64>, window: f64) -> bool {
        anchor.is_some_and(|x| (word.center_x() - x).abs() <= window)
    }
}

/// One predicate→field rule.
pub struct Rule {
    pub name: &'static str,
    pub field: Field,
    pub test: fn(&Word, &RuleContext<'_>) -> bool,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("field", &self.field)
            .finish()
    }
}

/// Whether the token looks like a known cutter type code.
pub fn is_cutter_type(text: &str) -> bool {
    CUTTER_TYPE_RE.is_match(text)
}

/// Whether the token looks like a chamfer designation.
pub fn is_chamfer(text: &str) -> bool {
    CHAMFER_RE.is_match(text)
}

pub fn is_material(text: &str) -> bool {
    MATERIAL_RE.is_match(text)
}

pub fn is_family(text: &str) -> bool {
    FAMILY_RE.is_match(text)
}

/// The default rule list, highest priority first.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "type-pattern",
            field: Field::CutterType,
            test: |w, _| is_cutter_type(&w.text),
        },
        Rule {
            name: "size",
            field: Field::Size,
            test: |w, ctx| {
                SIZE_RE.is_match(&w.text)
                    && (ctx.anchors.size.is_none()
                        || ctx.near(w, ctx.anchors.size, ctx.options.column_window))
            },
        },
        Rule {
            name: "count-near-anchor",
            field: Field::Count,
            test: |w, ctx| {
                COUNT_RE.is_match(&w.text)
                    && ctx.near(w, ctx.anchors.count, ctx.options.column_window)
            },
        },
        Rule {
            name: "chamfer",
            field: Field::Chamfer,
            test: |w, _| is_chamfer(&w.text),
        },
        Rule {
            name: "material-near-anchor",
            field: Field::Material,
            test: |w, ctx| {
                is_material(&w.text)
                    && ctx.near(w, ctx.anchors.material, ctx.options.column_window)
            },
        },
        Rule {
            name: "type-column",
            field: Field::CutterType,
            test: |w, ctx| {
                w.text.chars().any(|c| c.is_ascii_alphabetic())
                    && ctx.near(w, ctx.anchors.cutter_type, ctx.options.type_window)
            },
        },
    ]
}

/// The field a token fills, given the fields its row already has.
pub fn classify<'r>(
    word: &Word,
    ctx: &RuleContext<'_>,
    rules: &'r [Rule],
    filled: impl Fn(Field) -> bool,
) -> Option<&'r Rule> {
    rules
        .iter()
        .find(|rule| !filled(rule.field) && (rule.test)(word, ctx))
}
