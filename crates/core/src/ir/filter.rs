//! Include/exclude tag filtering over operations.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

use super::api::{Ir, IrOperation, IrService};

/// Compiled include/exclude tag patterns.
///
/// Patterns are unanchored regular expressions matched against every tag an
/// operation declares. An empty include list admits everything; a matching
/// exclude pattern always wins.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl TagFilter {
    /// Compile both lists; the first bad pattern is reported verbatim.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile("includeTags", include)?,
            exclude: compile("excludeTags", exclude)?,
        })
    }

    /// A filter that admits every operation.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// True when neither list has a pattern.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    fn included(&self, tag: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(tag))
    }

    fn excluded(&self, tag: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(tag))
    }

    /// Decide on an operation's full tag list.
    pub fn allows<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        let included = tags.iter().any(|t| self.included(t.as_ref()));
        let excluded = tags.iter().any(|t| self.excluded(t.as_ref()));
        included && !excluded
    }

    /// The first tag admitted by the include list, used for grouping.
    fn grouping_tag<'t>(&self, tags: &[&'t str]) -> Option<&'t str> {
        tags.iter().copied().find(|t| self.included(t))
    }

    /// Derive an IR keeping only admitted operations, regrouped by their first
    /// admitted tag. Services left without operations disappear. Models are
    /// carried over untouched.
    pub fn apply(&self, ir: &Ir) -> Ir {
        let mut services: BTreeMap<String, Vec<IrOperation>> = BTreeMap::new();
        let mut dropped = 0usize;

        for op in ir.operations() {
            let tags = op.effective_tags();
            if !self.allows(&tags) {
                dropped += 1;
                continue;
            }
            let tag = self.grouping_tag(&tags).unwrap_or(op.tag.as_str()).to_string();
            let mut op = op.clone();
            op.tag = tag.clone();
            services.entry(tag).or_default().push(op);
        }

        debug!(dropped, kept_services = services.len(), "Applied tag filter");

        Ir {
            services: services
                .into_iter()
                .map(|(tag, mut operations)| {
                    operations.sort_by(|a, b| (&a.path, a.method.as_str()).cmp(&(&b.path, b.method.as_str())));
                    IrService { tag, operations }
                })
                .collect(),
            model_defs: ir.model_defs.clone(),
            security_schemes: ir.security_schemes.clone(),
        }
    }
}

fn compile<S: AsRef<str>>(list: &'static str, patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            let pattern = p.as_ref();
            Regex::new(pattern).map_err(|source| Error::InvalidTagPattern {
                list,
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}
