//! Personnel vs. recipient disambiguation for Turkish tender text.
//!
//! Tender documents routinely mention two kinds of head counts in the
//! same sentence: the staff a contractor must employ and the people who
//! will be fed. Only the latter drives revenue. Each standalone integer
//! is run through an ordered rule cascade (first match wins):
//!
//! 1. Staffing verb: "8 personel çalıştırılacak" → personnel
//! 2. Staff roster: "1 aşçıbaşı, 3 aşçı, 2 garson" → personnel, summed
//! 3. Agentive "tarafından": "8 personel tarafından" → personnel
//! 4. Dative recipient: "500 öğrenciye", "1000 kişiye" → recipient
//! 5. Capacity: "700 kişilik yemekhane", "günlük 500 kişi" → recipient
//! 6. Sub-facility list: "Huzurevi: 150 kişi, Çocuk Evi: 80 kişi" → recipient
//! 7. Bare count noun with no clarifying context: "8 personel" → ambiguous
//!
//! Numbers that match none of these (days, meal counts, clause numbers)
//! are not head counts and are left out, though meal-plan phrases are
//! collected separately so a total meal count can be converted back into
//! a headcount.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::{leading_chars, turkish_lowercase};

lazy_static! {
    // Integers, with optional dot-grouped thousands ("260.000").
    static ref NUMBER: Regex = Regex::new(r"\d+(?:[.,]\d+)*").expect("number pattern");

    static ref STAFFING_VERB_AFTER: Regex = Regex::new(
        r"^\s*(?:personel|aşçıbaşı|aşçı|garson|hizmetli|işçi|çalışan|eleman)\s+(?:daha\s+)?(?:çalıştırılacak|görevlendirilecek|istihdam\s+edilecek|istihdam)"
    ).expect("staffing verb pattern");

    static ref STAFFING_VERB_BEFORE: Regex =
        Regex::new(r"(?:çalıştırılacak|görevlendirilecek)\s+$").expect("staffing verb prefix pattern");

    static ref STAFF_NOUN_AFTER: Regex =
        Regex::new(r"^\s*(?:personel|eleman)\b").expect("staff noun pattern");

    static ref ROSTER_ITEM: Regex = Regex::new(
        r"(\d+)\s+(?:aşçıbaşı|aşçı|kebap\s+ustası|yardımcı|garson|hizmetli|bulaşıkçı|diyetisyen)"
    ).expect("roster item pattern");

    static ref ROSTER_AFTER: Regex = Regex::new(
        r"^\s+(?:aşçıbaşı|aşçı|kebap\s+ustası|yardımcı|garson|hizmetli|bulaşıkçı|diyetisyen)"
    ).expect("roster member pattern");

    static ref AGENTIVE_AFTER: Regex = Regex::new(
        r"^\s*(?:personel|aşçıbaşı|aşçı|garson|işçi|çalışan|eleman)\b.*?tarafından"
    ).expect("agentive pattern");

    static ref DATIVE_AFTER: Regex = Regex::new(
        r"^\s*(?:kişiye|öğrenciye|hastaya|refakatçiye|yaşlıya|çocuğa|misafire|sakine|(?:personele|çalışana)\s+(?:yemek|hizmet))"
    ).expect("dative pattern");

    static ref CAPACITY_AFTER: Regex = Regex::new(
        r"^\s*kişi(?:lik\s+(?:yemekhane|kafeterya|mutfak|tesis|salon)|\b.*?yemek)"
    ).expect("capacity pattern");

    static ref CAPACITY_BEFORE: Regex =
        Regex::new(r"(?:günlük|günde|her\s+gün)\s+$").expect("daily capacity prefix pattern");

    static ref PERSON_AFTER: Regex =
        Regex::new(r"^\s*kişi(?:[\s,;.)]|$)").expect("person noun pattern");

    static ref FACILITY_BEFORE: Regex =
        Regex::new(r"\p{L}\s*[:\-–]\s*$").expect("facility label pattern");

    static ref FACILITY_ITEM: Regex = Regex::new(
        r"(\p{L}[\p{L} ]{0,60}?)\s*[:\-–]\s*(\d{1,3}(?:\.\d{3})+|\d+)\s*kişi(?:[\s,;.)]|$)"
    ).expect("facility item pattern");

    static ref STATED_TOTAL: Regex = Regex::new(
        r"toplam[^\d\n]{0,20}?(\d{1,3}(?:\.\d{3})+|\d+)\s*kişi(?:[\s,;.)]|$)"
    ).expect("stated total pattern");

    static ref BARE_COUNT_NOUN_AFTER: Regex = Regex::new(
        r"^\s*(?:personel|kişi|eleman|işçi|çalışan|öğrenci|hasta)(?:[\s,;.)(]|$)"
    ).expect("bare count noun pattern");

    static ref MEALS_AFTER: Regex =
        Regex::new(r"^\s*(?:adet\s+)?öğün").expect("meal pattern");

    static ref DAYS_AFTER: Regex =
        Regex::new(r"^\s*(?:takvim\s+|iş\s+)?gün(?:[\s,;.)]|$)").expect("day pattern");
}

/// Phrase excerpt length kept as evidence for each mention.
const PHRASE_CHARS: usize = 60;

/// Meal counts at or above this are totals, not per-day counts.
const TOTAL_MEALS_FLOOR: u32 = 100;

/// Grammatical role of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberContext {
    Personnel,
    Recipient,
    Ambiguous,
}

/// The rule that decided a number's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextRule {
    StaffingVerb,
    StaffRoster,
    Agentive,
    DativeRecipient,
    Capacity,
    FacilityList,
    BareCountNoun,
}

impl ContextRule {
    pub fn context(&self) -> NumberContext {
        match self {
            ContextRule::StaffingVerb | ContextRule::StaffRoster | ContextRule::Agentive => {
                NumberContext::Personnel
            }
            ContextRule::DativeRecipient | ContextRule::Capacity | ContextRule::FacilityList => {
                NumberContext::Recipient
            }
            ContextRule::BareCountNoun => NumberContext::Ambiguous,
        }
    }
}

/// One classified number with the phrase that justified it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberMention {
    pub value: u32,
    pub rule: ContextRule,
    pub phrase: String,
}

/// A per-facility head count from an enumerated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityCount {
    pub name: String,
    pub count: u32,
}

/// Meal-plan figures stated in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MealPlanHints {
    /// Largest total meal count ("260.000 öğün").
    pub total_meals: Option<u32>,
    /// "günde 3 öğün"
    pub meals_per_day: Option<u32>,
    /// "365 gün"
    pub days: Option<u32>,
}

impl MealPlanHints {
    fn observe(&mut self, value: u32, before: &str, after: &str) {
        if MEALS_AFTER.is_match(after) {
            if CAPACITY_BEFORE.is_match(before) || value < TOTAL_MEALS_FLOOR {
                if (1..=6).contains(&value) && self.meals_per_day.is_none() {
                    self.meals_per_day = Some(value);
                }
            } else if self.total_meals.map_or(true, |t| value > t) {
                self.total_meals = Some(value);
            }
        } else if DAYS_AFTER.is_match(after) && value > 0 && self.days.is_none() {
            self.days = Some(value);
        }
    }
}

/// Classification of every head-count number found in a text.
///
/// Each occurrence gets exactly one context. The same value can still
/// land in two sets when distinct phrases support both readings; see
/// [`DisambiguationResult::contradictions`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisambiguationResult {
    pub personnel_numbers: Vec<u32>,
    pub recipient_numbers: Vec<u32>,
    pub ambiguous_numbers: Vec<u32>,

    /// Every classified occurrence, in text order.
    pub mentions: Vec<NumberMention>,

    /// Sum of the first enumerated staff roster.
    pub staff_roster_total: Option<u32>,

    /// Per-facility head counts, when at least two are listed.
    pub facility_counts: Vec<FacilityCount>,

    /// An explicitly stated overall head count ("toplam 275 kişi").
    pub stated_total: Option<u32>,

    pub meal_plan: MealPlanHints,
}

impl DisambiguationResult {
    fn record(&mut self, value: u32, rule: ContextRule, phrase: String) {
        let context = rule.context();
        let confident = self.is_personnel(value) || self.is_recipient(value);

        // a confident reading anywhere in the text outranks a bare mention
        let set = match context {
            NumberContext::Personnel => Some(&mut self.personnel_numbers),
            NumberContext::Recipient => Some(&mut self.recipient_numbers),
            NumberContext::Ambiguous if confident => None,
            NumberContext::Ambiguous => Some(&mut self.ambiguous_numbers),
        };
        if let Some(set) = set {
            if !set.contains(&value) {
                set.push(value);
            }
        }
        if context != NumberContext::Ambiguous {
            self.ambiguous_numbers.retain(|v| *v != value);
        }
        self.mentions.push(NumberMention {
            value,
            rule,
            phrase,
        });
    }

    /// Values supported as both personnel and recipient by distinct phrases.
    pub fn contradictions(&self) -> Vec<u32> {
        self.personnel_numbers
            .iter()
            .copied()
            .filter(|v| self.recipient_numbers.contains(v))
            .collect()
    }

    /// Sum of the listed facility counts, when a list was found.
    pub fn facility_total(&self) -> Option<u32> {
        (self.facility_counts.len() >= 2)
            .then(|| self.facility_counts.iter().map(|f| f.count).sum())
    }

    /// The first phrase that put `value` in `context`.
    pub fn phrase_for(&self, value: u32, context: NumberContext) -> Option<&str> {
        self.mentions
            .iter()
            .find(|m| m.value == value && m.rule.context() == context)
            .map(|m| m.phrase.as_str())
    }

    pub fn is_personnel(&self, value: u32) -> bool {
        self.personnel_numbers.contains(&value)
    }

    pub fn is_recipient(&self, value: u32) -> bool {
        self.recipient_numbers.contains(&value)
    }

    pub fn is_ambiguous(&self, value: u32) -> bool {
        self.ambiguous_numbers.contains(&value)
    }
}

/// Parse an integer token, accepting dot-grouped thousands.
///
/// Decimals and dates ("27,40", "15.03.2025") are not integers.
fn parse_integer(token: &str) -> Option<u32> {
    if token.contains(',') {
        return None;
    }
    let groups: Vec<&str> = token.split('.').collect();
    if groups.len() > 1 {
        let grouped = (1..=3).contains(&groups[0].len())
            && groups[1..].iter().all(|g| g.len() == 3);
        if !grouped {
            return None;
        }
    }
    groups.concat().parse().ok()
}

/// Split into sentence and line segments.
///
/// A dot ends a sentence only when followed by whitespace and not
/// preceded by a digit, so "1. Kısım" and "260.000" stay intact.
fn segments(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|(_, n)| *n);
        let boundary = match c {
            '!' | '?' | ';' | '\n' => true,
            '.' => {
                next.map_or(true, char::is_whitespace)
                    && !prev.is_some_and(|p| p.is_ascii_digit())
            }
            _ => false,
        };
        if boundary {
            let segment = text[start..idx].trim();
            if !segment.is_empty() {
                out.push(segment);
            }
            start = idx + c.len_utf8();
        }
        prev = Some(c);
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn find_facility_counts(text: &str) -> Vec<FacilityCount> {
    FACILITY_ITEM
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().trim().to_string();
            if name.contains("toplam") {
                return None;
            }
            let count = parse_integer(caps.get(2)?.as_str())?;
            Some(FacilityCount { name, count })
        })
        .collect()
}

/// Apply the rule cascade to one number occurrence.
fn classify_number(
    before: &str,
    after: &str,
    in_roster: bool,
    facility_list: bool,
) -> Option<ContextRule> {
    if STAFFING_VERB_AFTER.is_match(after)
        || (STAFFING_VERB_BEFORE.is_match(before) && STAFF_NOUN_AFTER.is_match(after))
    {
        return Some(ContextRule::StaffingVerb);
    }
    if in_roster && ROSTER_AFTER.is_match(after) {
        return Some(ContextRule::StaffRoster);
    }
    if AGENTIVE_AFTER.is_match(after) {
        return Some(ContextRule::Agentive);
    }
    if DATIVE_AFTER.is_match(after) {
        return Some(ContextRule::DativeRecipient);
    }
    if CAPACITY_AFTER.is_match(after)
        || (CAPACITY_BEFORE.is_match(before) && PERSON_AFTER.is_match(after))
    {
        return Some(ContextRule::Capacity);
    }
    if facility_list && FACILITY_BEFORE.is_match(before) && PERSON_AFTER.is_match(after) {
        return Some(ContextRule::FacilityList);
    }
    if BARE_COUNT_NOUN_AFTER.is_match(after) {
        return Some(ContextRule::BareCountNoun);
    }
    None
}

/// Find and classify every head-count number in `text`.
pub fn disambiguate(text: &str) -> DisambiguationResult {
    let lowered = turkish_lowercase(text);
    let mut result = DisambiguationResult::default();

    let facilities = find_facility_counts(&lowered);
    let facility_list = facilities.len() >= 2;

    result.stated_total = STATED_TOTAL
        .captures(&lowered)
        .and_then(|caps| parse_integer(caps.get(1)?.as_str()));

    for segment in segments(&lowered) {
        let roster: Vec<u32> = ROSTER_ITEM
            .captures_iter(segment)
            .filter_map(|caps| parse_integer(caps.get(1)?.as_str()))
            .collect();
        let in_roster = roster.len() >= 2;
        if in_roster && result.staff_roster_total.is_none() {
            result.staff_roster_total = Some(roster.iter().sum());
        }

        for m in NUMBER.find_iter(segment) {
            let Some(value) = parse_integer(m.as_str()) else {
                continue;
            };
            let before = &segment[..m.start()];
            let after = &segment[m.end()..];

            result.meal_plan.observe(value, before, after);

            if let Some(rule) = classify_number(before, after, in_roster, facility_list) {
                let phrase = leading_chars(&segment[m.start()..], PHRASE_CHARS)
                    .trim()
                    .to_string();
                result.record(value, rule, phrase);
            }
        }
    }

    if facility_list {
        result.facility_counts = facilities;
    }
    result
}
