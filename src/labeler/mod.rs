pub mod dictionary;
pub mod rules;

use std::collections::BTreeMap;

pub use dictionary::Dictionary;

use rules::{apply_rules, Signals};

/// The seven engagement labels, in coding-sheet column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Label {
    Vp,
    EInt,
    EExt,
    Cyn,
    Norm,
    Info,
    Mobi,
}

impl Label {
    pub const ALL: [Label; 7] = [
        Label::Vp,
        Label::EInt,
        Label::EExt,
        Label::Cyn,
        Label::Norm,
        Label::Info,
        Label::Mobi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Label::Vp => "VP",
            Label::EInt => "E_int",
            Label::EExt => "E_ext",
            Label::Cyn => "Cyn",
            Label::Norm => "Norm",
            Label::Info => "Info",
            Label::Mobi => "Mobi",
        }
    }

    pub fn pred_column(self) -> &'static str {
        match self {
            Label::Vp => "pred_VP",
            Label::EInt => "pred_E_int",
            Label::EExt => "pred_E_ext",
            Label::Cyn => "pred_Cyn",
            Label::Norm => "pred_Norm",
            Label::Info => "pred_Info",
            Label::Mobi => "pred_Mobi",
        }
    }
}

/// In-progress 0/1 label values, mutated by the priority rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelVector([u8; 7]);

impl LabelVector {
    pub fn get(&self, label: Label) -> u8 {
        self.0[label as usize]
    }

    pub fn set(&mut self, label: Label, value: u8) {
        self.0[label as usize] = value;
    }
}

/// Final labeling of one comment: values, applied-rule trace, and the raw
/// keyword matches per label (suppressed labels keep their matches).
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub labels: LabelVector,
    pub rules_applied: Vec<&'static str>,
    pub matched_keywords: BTreeMap<Label, Vec<String>>,
}

impl Assignment {
    pub fn value(&self, label: Label) -> u8 {
        self.labels.get(label)
    }

    /// Trace joined for the debug column, e.g. "VP_negated;Cyn_overrides_positive".
    pub fn rules_joined(&self) -> String {
        self.rules_applied.join(";")
    }

    /// Matched keywords as a JSON object keyed by label name.
    pub fn keywords_json(&self) -> String {
        let mut map = serde_json::Map::new();
        for (label, matches) in &self.matched_keywords {
            map.insert(
                label.name().to_string(),
                serde_json::Value::from(matches.clone()),
            );
        }
        serde_json::Value::Object(map).to_string()
    }
}

/// Dictionary-driven labeler with priority-rule conflict resolution.
pub struct Labeler {
    dict: Dictionary,
}

impl Labeler {
    pub fn new() -> Self {
        Self {
            dict: Dictionary::default(),
        }
    }

    pub fn with_dictionary(dict: Dictionary) -> Self {
        Self { dict }
    }

    /// Label one text. Pure: identical input always yields identical output,
    /// and calls share no state.
    pub fn resolve(&self, text: &str) -> Assignment {
        let text_lower = text.to_lowercase();

        let mut raw = LabelVector::default();
        let mut matched_keywords = BTreeMap::new();
        for label in Label::ALL {
            let matches = keyword_matches(&text_lower, self.dict.entries(label));
            if !matches.is_empty() {
                raw.set(label, 1);
                matched_keywords.insert(label, matches);
            }
        }

        let vp_negated =
            !keyword_matches(&text_lower, &self.dict.vote_pledge_negations).is_empty();

        let signals = Signals { raw, vp_negated };
        let (labels, rules_applied) = apply_rules(&signals);

        Assignment {
            labels,
            rules_applied,
            matched_keywords,
        }
    }
}

impl Default for Labeler {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-folded substring scan: every dictionary entry contained in the text,
/// in dictionary order. Category semantics are the OR of its entries.
fn keyword_matches(text_lower: &str, entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter(|kw| text_lower.contains(&kw.to_lowercase()))
        .cloned()
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_vote_pledge_detection() {
        let labeler = Labeler::new();
        let result = labeler.resolve("明日投票に行ってきます");
        assert_eq!(result.value(Label::Vp), 1);
        assert_eq!(result.value(Label::Cyn), 0);
    }

    #[test]
    fn basic_external_efficacy_detection() {
        let labeler = Labeler::new();
        let result = labeler.resolve("私たちの一票で政治を変えることができる");
        assert_eq!(result.value(Label::EExt), 1);
    }

    #[test]
    fn mobilization_with_vote_pledge() {
        let labeler = Labeler::new();
        let result = labeler.resolve("みんなで投票に行こう！友達も誘って");
        assert_eq!(result.value(Label::Mobi), 1);
        assert_eq!(result.value(Label::Vp), 1);
    }

    #[test]
    fn empty_text_yields_all_zeros() {
        let labeler = Labeler::new();
        let result = labeler.resolve("");
        for label in Label::ALL {
            assert_eq!(result.value(label), 0);
        }
        assert!(result.rules_applied.is_empty());
        assert!(result.matched_keywords.is_empty());
    }

    #[test]
    fn deterministic_across_calls() {
        let labeler = Labeler::new();
        let text = "投票は国民の義務だし行くべきだけど、結局は茶番で意味ないよね。";
        let a = labeler.resolve(text);
        let b = labeler.resolve(text);
        assert_eq!(a, b);
    }

    #[test]
    fn matched_keywords_recorded_for_transparency() {
        let labeler = Labeler::new();
        let result = labeler.resolve("投票行く予定。ちゃんと調べて判断する。");
        assert!(result.matched_keywords[&Label::Vp].contains(&"投票行く".to_string()));
        let e_int = &result.matched_keywords[&Label::EInt];
        assert!(e_int.iter().any(|kw| kw == "調べて" || kw == "判断する"));
    }

    #[test]
    fn unmatched_labels_absent_from_keyword_map() {
        let labeler = Labeler::new();
        let result = labeler.resolve("明日投票に行ってきます");
        assert!(result.matched_keywords.contains_key(&Label::Vp));
        assert!(!result.matched_keywords.contains_key(&Label::Cyn));
    }

    #[test]
    fn suppressed_label_keeps_its_matches() {
        let labeler = Labeler::new();
        let result = labeler.resolve("投票に行くけど、どうせ変わらないよね");
        assert_eq!(result.value(Label::Vp), 0);
        assert!(result.matched_keywords.contains_key(&Label::Vp));
    }

    #[test]
    fn keywords_json_uses_label_names() {
        let labeler = Labeler::new();
        let result = labeler.resolve("明日投票に行ってきます");
        let parsed: serde_json::Value = serde_json::from_str(&result.keywords_json()).unwrap();
        assert!(parsed.get("VP").is_some());
        assert!(parsed.get("Cyn").is_none());
    }

    #[test]
    fn latin_text_matches_case_insensitively() {
        let mut dict = Dictionary::default();
        dict.mobilization.push("Share This".to_string());
        let labeler = Labeler::with_dictionary(dict);
        let result = labeler.resolve("please share this with everyone");
        assert_eq!(result.value(Label::Mobi), 1);
    }
}
