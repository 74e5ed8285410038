//! Coarse category derivation from catalog metadata
//!
//! An ordered list of (category, predicate) rules evaluated first to last; the
//! first matching rule wins and records matching none are Non-Fiction.
//! Precedence matters: a record tagged both "Juvenile Fiction" and "Fiction" is
//! Children's because the Children's rule is evaluated first.
//!
//! Matching is on lower-cased substrings, not whole words.

use serde::Serialize;
use std::fmt;

use shelf_common::config::CategoryRuleConfig;

use crate::catalog::CatalogMetadata;

/// Report category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "Children's")]
    Childrens,
    #[serde(rename = "Young Adult")]
    YoungAdult,
    Fiction,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Childrens => "Children's",
            Category::YoungAdult => "Young Adult",
            Category::Fiction => "Fiction",
            Category::NonFiction => "Non-Fiction",
            Category::Unknown => "Unknown",
        }
    }

    /// Parse a category name as written in config (case-insensitive)
    ///
    /// `Unknown` is not accepted: it is reserved for records with no usable text.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "children's" | "childrens" | "children" => Some(Category::Childrens),
            "young adult" | "ya" => Some(Category::YoungAdult),
            "fiction" => Some(Category::Fiction),
            "non-fiction" | "nonfiction" => Some(Category::NonFiction),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule of the category engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: Category,
    /// Substrings matched against subjects and title
    pub keywords: Vec<String>,
    /// Substrings matched against the binding
    pub bindings: Vec<String>,
    /// Substrings removed from subjects and title before keyword matching
    pub ignore: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: lowered(keywords),
            bindings: Vec::new(),
            ignore: Vec::new(),
        }
    }

    pub fn with_bindings(mut self, bindings: &[&str]) -> Self {
        self.bindings = lowered(bindings);
        self
    }

    pub fn with_ignore(mut self, ignore: &[&str]) -> Self {
        self.ignore = lowered(ignore);
        self
    }

    fn matches(&self, text: &str, binding: &str) -> bool {
        if !binding.is_empty() && self.bindings.iter().any(|b| binding.contains(b.as_str())) {
            return true;
        }

        let mut text = text.to_string();
        for phrase in &self.ignore {
            text = text.replace(phrase.as_str(), " ");
        }

        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

fn lowered(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Ordered category rule engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl CategoryRules {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Built-in rules: Children's, then Young Adult, then Fiction
    pub fn builtin() -> Self {
        Self::new(vec![
            CategoryRule::new(
                Category::Childrens,
                &[
                    "children's books",
                    "children's fiction",
                    "children's nonfiction",
                    "juvenile fiction",
                    "juvenile nonfiction",
                    "juvenile literature",
                    "picture book",
                    "early reader",
                    "preschool",
                    "kindergarten",
                    "ages 0-",
                    "ages 2-",
                    "ages 3-",
                    "ages 4-",
                    "ages 5-",
                    "ages 6-",
                    "ages 7-",
                    "ages 8-",
                    "grades k",
                ],
            )
            .with_bindings(&["board book"]),
            CategoryRule::new(
                Category::YoungAdult,
                &[
                    "teen & young adult",
                    "young adult",
                    "teen fiction",
                    "teenage",
                    "teens",
                    "coming of age",
                    "coming-of-age",
                    "ages 12-",
                    "ages 13-",
                    "ages 14-",
                    "grades 7-",
                    "grades 8-",
                    "grades 9-",
                ],
            ),
            CategoryRule::new(
                Category::Fiction,
                &[
                    "genre fiction",
                    "fiction",
                    "novel",
                    "thriller",
                    "mystery",
                    "romance",
                    "fantasy",
                    "horror",
                    "short stories",
                ],
            )
            .with_ignore(&["nonfiction", "non-fiction"]),
        ])
    }

    /// Build from TOML rules; an empty list selects the built-in rules
    pub fn from_config(rules: &[CategoryRuleConfig]) -> Result<Self, String> {
        if rules.is_empty() {
            return Ok(Self::builtin());
        }

        let rules = rules
            .iter()
            .map(|rule| {
                let category = Category::from_name(&rule.category)
                    .ok_or_else(|| format!("unknown category in rule: {:?}", rule.category))?;
                Ok(CategoryRule {
                    category,
                    keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                    bindings: rule.bindings.iter().map(|b| b.to_lowercase()).collect(),
                    ignore: rule.ignore.iter().map(|i| i.to_lowercase()).collect(),
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Categorize one metadata record
    ///
    /// `Unknown` only when both the subjects and the title are empty.
    pub fn categorize(&self, metadata: &CatalogMetadata) -> Category {
        let subjects = metadata
            .subjects
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let title = metadata
            .title
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let binding = metadata
            .binding
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if subjects.is_empty() && title.is_empty() {
            return Category::Unknown;
        }

        let text = format!("{} | {}", subjects, title);

        self.rules
            .iter()
            .find(|rule| rule.matches(&text, &binding))
            .map(|rule| rule.category)
            .unwrap_or(Category::NonFiction)
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::builtin()
    }
}
