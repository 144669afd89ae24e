//! Rule-based frame classifier.
//!
//! Each frame is an independent rule: a list of phrase patterns evaluated over
//! the lowercased quote. All rules run on every input; the label is derived
//! from the set that matched (one → that frame, two or more → MIXED, none →
//! OTHER). Guards and the hedge ratio only ever subtract from confidence.
//!
//! Every LABOUR_THREAT phrase carries a labour-lexicon word and is at most a
//! handful of tokens long, so appending another threat phrase to a threat
//! quote can raise but never lower the density and strength components.

use std::sync::LazyLock;

use hansard_common::Frame;
use regex::Regex;
use serde::Serialize;

use crate::lexicon::{find_term_positions, Lexicon};
use crate::matcher::{closest_pair, normalize_whitespace, tokenize};

const LABOUR_NEED_PATTERNS: &[&str] = &[
    r"\b(?:shortage|scarcity|dearth|lack) of (?:labour|labor|workers|workmen|labourers|hands|men|manpower|man-power)\b",
    r"\b(?:labour|labor|manpower|man-power) (?:shortage|famine)\b",
    r"\b(?:need|want|require|demand)(?:s|ed|ing)? (?:for |of )?(?:more )?(?:labour|labor|workers|workmen|labourers|hands)\b",
    r"\bfill (?:the )?(?:vacancies|vacant places|places|posts)\b",
    r"\bessential (?:workers|labour|labor|industries|services)\b",
    r"\b(?:cannot|can not|could not|unable to) (?:get|obtain|find|procure) (?:labour|labor|workers|workmen|men|hands)\b",
    r"\b(?:recruit|import)(?:s|ed|ing)? (?:of )?(?:labour|labor|workers|labourers)\b",
];

const LABOUR_THREAT_PATTERNS: &[&str] = &[
    r"\b(?:depress|lower|reduc|cut|undercut|beat(?:ing)? down|drag(?:ging)? down|bring(?:ing)? down)\w* (?:the )?(?:rate of |rates of )?wages?\b",
    r"\bwages? (?:have |has |had |are |were )?(?:been )?(?:depressed|lowered|reduced|cut|fallen|driven down|beaten down)\b",
    r"\b(?:reduc|diminish|destroy|lessen|curtail)\w* (?:the )?(?:employment|jobs?)\b",
    r"\b(?:displac|oust|supplant|replac)\w* (?:our |the |british |english |native )?(?:own )?(?:workmen|labourers|labour|labor)\b",
    r"\b(?:tak|steal|snatch)\w* (?:away )?(?:our |the |their )?(?:jobs?|employment)\b",
    r"\bsurplus (?:of )?(?:labour|labor|labourers)\b",
    r"\bunemployment (?:is |has |was )?(?:increas|grow|ris)\w*",
    r"\bincreas\w* (?:of |in )?unemployment\b",
    r"\bsweated (?:labour|labor)\b",
    r"\bcompet\w* (?:with|against) (?:british |english |our |native )?(?:labour|labor|workmen|labourers)\b",
    r"\bcheap(?:er)? (?:alien |foreign )?(?:labour|labor)\b",
];

const RACIALISED_PATTERNS: &[&str] = &[
    r"\bundesirable(?:s| aliens?| immigrants?| foreigners?)\b",
    r"\b(?:pauper|destitute|diseased|criminal) (?:aliens?|immigrants?|foreigners?)\b",
    r"\b(?:coloured|colored|chinese|asiatic|oriental|yellow|black) (?:labour|labor|workmen|races?|men|people|immigrants?)\b",
    r"\b(?:race|races|racial)\b",
    r"\b(?:inferior|alien|lower|servile) (?:races?|stock|type|breed)\b",
    r"\b(?:scum|dregs|refuse|offscourings) of (?:europe|the continent|other nations)\b",
    r"\b(?:filthy|dirty|insanitary) (?:habits|aliens?|foreigners?)\b",
];

static PROCEDURAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\W*(?:hear,? hear|order,? order|order\b|division\b|adjourn\w*|question put|the house divided|ayes\b|noes\b)",
    )
    .expect("valid regex")
});

static STATISTICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:how many|number of|numbers of|return showing|statistics|statistical|figures (?:for|of|showing)|what proportion|percentage of)\b",
    )
    .expect("valid regex")
});

static LABOUR_PARTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\blabou?r (?:party|member|members|government|benches|candidate|movement)\b")
        .expect("valid regex")
});

static ECONOMIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:wages?|employment|unemploy\w*|jobs?|labou?r market|workmen|labourers?|trade unions?|strikes?|earnings)\b",
    )
    .expect("valid regex")
});

static HEDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:perhaps|possibly|probably|may|might|could|seems?|seemed|appears?|apparently|allegedly|suggest\w*|whether|supposing)\b",
    )
    .expect("valid regex")
});

static CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:i (?:say|maintain|contend|submit|assert|affirm)|it is (?:a fact|certain|clear|notorious|admitted)|there is no doubt|undoubtedly|the fact is|beyond question)\b",
    )
    .expect("valid regex")
});

static POLICY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:bill|act|clause|legislation|restrict\w*|exclu\w*|prohibit\w*|deport\w*|expel\w*|expulsion|admission|quota|regulat\w*|immigration officers?)\b",
    )
    .expect("valid regex")
});

static LINKAGE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // migrant subject followed closely by a harm verb
        r"\b(?:aliens?|immigrants?|immigration|foreigners?|migrants?)\b(?:\W+\w+){0,6}?\W+(?:depress|lower|reduc|displac|undercut|compet|oust|supplant|drive|driving|take|taking|steal)\w*",
        // harm attributed to migrants
        r"\b(?:because of|owing to|due to|caused by|result of|consequence of|by reason of)\W+(?:\w+\W+){0,4}?(?:aliens?|immigrants?|immigration|foreigners?|migrants?)\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

struct Rule {
    frame: Frame,
    patterns: Vec<Regex>,
}

impl Rule {
    fn new(frame: Frame, patterns: &[&str]) -> Self {
        Self {
            frame,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid regex"))
                .collect(),
        }
    }

    /// Number of pattern occurrences in `text`.
    fn hits(&self, text: &str) -> usize {
        self.patterns.iter().map(|p| p.find_iter(text).count()).sum()
    }
}

/// Fixed priority order. Order only matters for reporting; every rule is evaluated.
static RULES: LazyLock<[Rule; 3]> = LazyLock::new(|| {
    [
        Rule::new(Frame::LabourNeed, LABOUR_NEED_PATTERNS),
        Rule::new(Frame::LabourThreat, LABOUR_THREAT_PATTERNS),
        Rule::new(Frame::Racialised, RACIALISED_PATTERNS),
    ]
});

/// Everything the classifier saw, for explanation and auditing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Signals {
    pub token_count: usize,
    pub migration_hits: usize,
    pub labour_hits: usize,
    pub min_distance: Option<usize>,
    pub need_hits: usize,
    pub threat_hits: usize,
    pub racialised_hits: usize,
    pub matched: Vec<Frame>,
    pub linkage: bool,
    pub claim_hits: usize,
    pub policy_hits: usize,
    pub procedural: bool,
    pub statistical: bool,
    pub party_only: bool,
    pub hedge_ratio: f64,
}

impl Signals {
    pub fn guarded(&self) -> bool {
        self.procedural || self.statistical || self.party_only
    }

    fn rule_hits(&self, frame: Frame) -> usize {
        match frame {
            Frame::LabourNeed => self.need_hits,
            Frame::LabourThreat => self.threat_hits,
            Frame::Racialised => self.racialised_hits,
            Frame::Mixed | Frame::Other => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub frame: Frame,
    pub confidence: u8,
    pub signals: Signals,
}

pub struct Classifier {
    lexicon: Lexicon,
}

impl Classifier {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Frame label and 0-10 confidence. Never fails; empty text is `(OTHER, 0)`.
    pub fn classify(&self, text: &str) -> (Frame, u8) {
        let c = self.classify_detailed(text);
        (c.frame, c.confidence)
    }

    pub fn classify_detailed(&self, text: &str) -> Classification {
        let normalized = normalize_whitespace(text).to_lowercase();
        let tokens = tokenize(&normalized);
        if tokens.is_empty() {
            return Classification {
                frame: Frame::Other,
                confidence: 0,
                signals: Signals::default(),
            };
        }

        let signals = self.signals(&normalized, &tokens);
        let frame = match signals.matched.as_slice() {
            [] => Frame::Other,
            [only] => *only,
            _ => Frame::Mixed,
        };
        let confidence = score(&signals);
        Classification {
            frame,
            confidence,
            signals,
        }
    }

    fn signals(&self, text: &str, tokens: &[String]) -> Signals {
        let migration = find_term_positions(tokens, &self.lexicon.migration);
        let labour = find_term_positions(tokens, &self.lexicon.labour);
        let hedges = HEDGE_RE.find_iter(text).count();

        let mut signals = Signals {
            token_count: tokens.len(),
            migration_hits: migration.len(),
            labour_hits: labour.len(),
            min_distance: closest_pair(&migration, &labour).map(|p| p.distance),
            need_hits: RULES[0].hits(text),
            threat_hits: RULES[1].hits(text),
            racialised_hits: RULES[2].hits(text),
            matched: Vec::new(),
            linkage: LINKAGE_RES.iter().any(|re| re.is_match(text)),
            claim_hits: CLAIM_RE.find_iter(text).count(),
            policy_hits: POLICY_RE.find_iter(text).count(),
            procedural: PROCEDURAL_RE.is_match(text),
            statistical: STATISTICAL_RE.is_match(text),
            party_only: LABOUR_PARTY_RE.is_match(text) && !ECONOMIC_RE.is_match(text),
            hedge_ratio: hedges as f64 / tokens.len() as f64,
        };

        // Under a guard, a rule resting on a single unlinked hit is noise.
        let guarded = signals.guarded();
        let matched = RULES
            .iter()
            .map(|rule| rule.frame)
            .filter(|&frame| {
                let hits = signals.rule_hits(frame);
                hits > 0 && !(guarded && hits == 1 && !signals.linkage)
            })
            .collect();
        signals.matched = matched;
        signals
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Lexicon::builtin())
    }
}

/// Additive score, clamped to 0-10. Each bonus is non-decreasing in its signal.
fn score(s: &Signals) -> u8 {
    let hits = s.migration_hits + s.labour_hits;
    let density = if hits * 10 >= s.token_count {
        2
    } else if hits * 25 >= s.token_count {
        1
    } else {
        0
    };
    let balance = i32::from(s.migration_hits >= 2 && s.labour_hits >= 2);
    let proximity = match s.min_distance {
        Some(d) if d <= 5 => 3,
        Some(d) if d <= 10 => 2,
        Some(d) if d <= 20 => 1,
        _ => 0,
    };
    let strength = s
        .matched
        .iter()
        .map(|&f| s.rule_hits(f))
        .sum::<usize>()
        .min(2) as i32;
    let linkage = i32::from(s.linkage);
    let claim = i32::from(s.claim_hits > 0);
    let policy = i32::from(s.policy_hits > 0);

    let mut penalty = 0;
    if s.procedural {
        penalty += 2;
    }
    if s.statistical {
        penalty += 1;
    }
    if s.party_only {
        penalty += 2;
    }
    if s.hedge_ratio > 0.05 {
        penalty += 1;
    }

    let total = density + balance + proximity + strength + linkage + claim + policy - penalty;
    total.clamp(0, 10) as u8
}
