//! Share texts and the outbound intent link.

use url::Url;

use crate::reward::{RandomSource, RewardKind};

/// Replaced with the configured contract address in every template.
pub const CONTRACT_TOKEN: &str = "{contract}";

pub const DEFAULT_SHARE_ENDPOINT: &str = "https://twitter.com/intent/tweet";
pub const SHARE_TEXT_PARAM: &str = "text";

const GOOD_TEMPLATES: [&str; 3] = [
    "🎉🧧 OMG, I just got the Legendary Prize from $Hongbao! ✨💎\nThis is my luckiest day ever! Don't miss out!\n📜 Contract Address: {contract}",
    "🧧💰 Luck from the Red Envelope! I just hit a legendary reward on $Hongbao! 🔥\nTry your luck now and join the fun!\n📜 Contract Address: {contract}",
    "🔥✨ Can't believe it! The $Hongbao gacha blessed me with the Legendary Prize! 🧧🎊\nFeeling super lucky today!\n📜 Contract Address: {contract}",
];

const BAD_TEMPLATES: [&str; 3] = [
    "💔🧧 Ugh, I just got the worst reward from $Hongbao... 😭\nMy luck must be on vacation. Someone send me some good vibes!\n📜 Contract Address: {contract}",
    "😩💀 $Hongbao really humbled me today... Got the worst prize imaginable. 🧧💔\nMy luck is cursed—anyone wanna share theirs?\n📜 Contract Address: {contract}",
    "🤡🧧 No way... I got trash from $Hongbao gacha!\nLuck was not on my side today. Gonna need a charm or something. 😅\n📜 Contract Address: {contract}",
];

/// Fixed share templates, keyed by reward tier.
#[derive(Clone, Debug)]
pub struct ShareMessageSet {
    contract_address: String,
}

impl ShareMessageSet {
    pub fn new(contract_address: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into(),
        }
    }

    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    pub fn templates(kind: RewardKind) -> &'static [&'static str] {
        match kind {
            RewardKind::Good => &GOOD_TEMPLATES,
            RewardKind::Bad => &BAD_TEMPLATES,
        }
    }

    pub fn pick_share_message(&self, kind: RewardKind, rng: &mut impl RandomSource) -> String {
        let templates = Self::templates(kind);
        let template = templates[rng.pick_index(templates.len())];
        template.replace(CONTRACT_TOKEN, &self.contract_address)
    }
}

/// Intent link with `message` as the `text` query parameter.
pub fn build_share_url(endpoint: &Url, message: &str) -> Url {
    let mut url = endpoint.clone();
    url.query_pairs_mut().append_pair(SHARE_TEXT_PARAM, message);
    url
}

/// `0x1234...abcd` style display form.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
