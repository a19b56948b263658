//! Ordered priority rules resolving conflicts between raw detections.
//!
//! The rules form a fixed total order of override operations applied to a
//! mutable label vector. Later rules observe the effects of earlier ones;
//! the order must not change.

use super::{Label, LabelVector};

/// Raw per-category detections plus the vote-pledge negation flag, as fed
/// into the rule pipeline.
pub struct Signals {
    pub raw: LabelVector,
    pub vp_negated: bool,
}

struct PriorityRule {
    id: &'static str,
    applies: fn(&LabelVector, &Signals) -> bool,
    apply: fn(&mut LabelVector),
}

/// Rule order is load-bearing: negation resolves before cynicism dominance,
/// and the mobilization annotation reads the already-resolved vector.
const PRIORITY_RULES: &[PriorityRule] = &[
    // A stated refusal to vote cancels the vote-pledge detection before any
    // other rule consumes it.
    PriorityRule {
        id: "VP_negated",
        applies: |_, signals| signals.vp_negated,
        apply: |labels| labels.set(Label::Vp, 0),
    },
    // Cynicism contradicts the pledge, external efficacy, normative appeals
    // and mobilization. It coexists with internal efficacy (studying but
    // cynical) and information seeking (asking how but cynical), which pass
    // through untouched.
    PriorityRule {
        id: "Cyn_overrides_positive",
        applies: |labels, _| labels.get(Label::Cyn) == 1,
        apply: |labels| {
            labels.set(Label::Cyn, 1);
            labels.set(Label::Vp, 0);
            labels.set(Label::EExt, 0);
            labels.set(Label::Norm, 0);
            labels.set(Label::Mobi, 0);
        },
    },
    // Advisory only: mobilization alongside a surviving vote pledge is worth
    // flagging for the coder, but changes no label value.
    PriorityRule {
        id: "Mobi_enhances_VP",
        applies: |labels, _| {
            labels.get(Label::Mobi) == 1
                && labels.get(Label::Vp) == 1
                && labels.get(Label::Cyn) == 0
        },
        apply: |_| {},
    },
];

/// Run the pipeline over a copy of the raw detections. Returns the final
/// label vector and the ordered trace of rule ids that fired.
pub fn apply_rules(signals: &Signals) -> (LabelVector, Vec<&'static str>) {
    let mut labels = signals.raw.clone();
    let mut applied = Vec::new();

    for rule in PRIORITY_RULES {
        if (rule.applies)(&labels, signals) {
            (rule.apply)(&mut labels);
            applied.push(rule.id);
        }
    }

    (labels, applied)
}

// ── Tests ──
