use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::Label;

/// Literal keyword lists behind the labeler. This is data, not logic: the
/// study team can amend a list in a JSON file and load it with
/// `Dictionary::from_json_file` without touching the resolver. Omitted keys
/// fall back to the built-in study lists.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Dictionary {
    pub vote_pledge: Vec<String>,
    pub internal_efficacy: Vec<String>,
    pub external_efficacy: Vec<String>,
    pub cynicism: Vec<String>,
    pub normative_appeal: Vec<String>,
    pub info_seeking: Vec<String>,
    pub mobilization: Vec<String>,
    pub vote_pledge_negations: Vec<String>,
}

impl Dictionary {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dictionary file {}", path.display()))?;
        let dict = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid dictionary JSON in {}", path.display()))?;
        Ok(dict)
    }

    pub fn entries(&self, label: Label) -> &[String] {
        match label {
            Label::Vp => &self.vote_pledge,
            Label::EInt => &self.internal_efficacy,
            Label::EExt => &self.external_efficacy,
            Label::Cyn => &self.cynicism,
            Label::Norm => &self.normative_appeal,
            Label::Info => &self.info_seeking,
            Label::Mobi => &self.mobilization,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Dictionary {
    fn default() -> Self {
        Self {
            vote_pledge: strings(&[
                "投票行く",
                "投票いく",
                "投票いき",
                "投票に行",
                "行ってくる",
                "行ってきた",
                "投票した",
                "期日前",
                "投票する",
                "選挙行",
                "投票所",
                "投票済",
                "投票しよう",
            ]),
            internal_efficacy: strings(&[
                "調べる",
                "調べて",
                "調べた",
                "勉強する",
                "ちゃんと考え",
                "理解して",
                "判断する",
                "情報収集",
                "比較して",
            ]),
            external_efficacy: strings(&[
                "一票でも",
                "変えられる",
                "声が届く",
                "政治を変える",
                "社会を変える",
                "民主主義",
                "主権在民",
                "私たちの声",
            ]),
            cynicism: strings(&[
                "どうせ変わらない",
                "意味ない",
                "無駄",
                "変わらん",
                "茶番",
                "出来レース",
                "利権",
                "癒着",
                "腐って",
            ]),
            normative_appeal: strings(&[
                "行くべき",
                "行かなきゃ",
                "行かないのは",
                "責任",
                "国民の義務",
                "権利を行使",
            ]),
            info_seeking: strings(&[
                "どこで",
                "やり方",
                "方法",
                "候補者",
                "政策",
                "何時から",
                "持ち物",
                "場所",
                "投票用紙",
            ]),
            mobilization: strings(&[
                "みんなで",
                "一緒に行こう",
                "友達と",
                "家族と",
                "声をかけて",
                "誘って",
                "広めて",
                "シェアして",
                "拡散",
                "周りの人",
            ]),
            vote_pledge_negations: strings(&[
                "投票行かない",
                "投票に行かない",
                "投票しない",
                "選挙行かない",
                "投票できない",
                "投票やめ",
                "投票いかない",
            ]),
        }
    }
}

// ── Tests ──
