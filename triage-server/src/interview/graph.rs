//! Symptom interview decision graph
//!
//! Nodes and transitions of the structured interview. The graph is pure
//! data plus one pure function, [`SymptomGraph::step`]; conversation state
//! lives with the caller (see `interview::state`).
//!
//! Authoring convention: the LAST option of every node is the safe exit,
//! the lowest-risk choice taken whenever an answer is ambiguous. Duration
//! resolution and the response matcher both rely on it, and
//! [`SymptomGraph::validate`] enforces it.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::InterviewError;
use crate::interview::matcher::reads_as_escape;
use crate::models::ClinicalTag;
use crate::scoring::Signal;

pub const ROOT_NODE: &str = "root";
pub const TERMINAL_NODE: &str = "end";

/// Prompt language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

/// Text in every supported language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Localized {
    pub en: &'static str,
    pub hi: &'static str,
}

impl Localized {
    pub fn get(&self, language: Language) -> &'static str {
        match language {
            Language::En => self.en,
            Language::Hi => self.hi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    SingleChoice,
    MultiChoice,
    Boolean,
    Info,
}

/// Day-count predicate on duration options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "days")]
pub enum DayCondition {
    AtMost(u32),
    MoreThan(u32),
}

impl DayCondition {
    pub fn holds(&self, days: u32) -> bool {
        match *self {
            DayCondition::AtMost(limit) => days <= limit,
            DayCondition::MoreThan(limit) => days > limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymptomOption {
    pub label: Localized,
    pub next: &'static str,
    pub risk_score: i32,
    pub tags: Vec<ClinicalTag>,
    /// Checklist facts this answer asserts, used by the severity scorer
    #[serde(skip)]
    pub signals: Vec<Signal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<DayCondition>,
    /// Extra free-text terms (bilingual, transliterated) for the matcher
    #[serde(skip)]
    pub synonyms: Vec<&'static str>,
}

impl SymptomOption {
    fn new(en: &'static str, hi: &'static str, next: &'static str) -> Self {
        Self {
            label: Localized { en, hi },
            next,
            risk_score: 0,
            tags: Vec::new(),
            signals: Vec::new(),
            condition: None,
            synonyms: Vec::new(),
        }
    }

    fn score(mut self, risk_score: i32) -> Self {
        self.risk_score = risk_score;
        self
    }

    fn tags(mut self, tags: &[ClinicalTag]) -> Self {
        self.tags = tags.to_vec();
        self
    }

    fn signals(mut self, signals: &[Signal]) -> Self {
        self.signals = signals.to_vec();
        self
    }

    fn when(mut self, condition: DayCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    fn synonyms(mut self, synonyms: &[&'static str]) -> Self {
        self.synonyms = synonyms.to_vec();
        self
    }

    /// True when the English label reads as a negative / normal / none answer
    pub fn is_negative(&self) -> bool {
        let label = self.label.en.to_lowercase();
        label == "no"
            || label.starts_with("no ")
            || label.contains("none")
            || label.contains("normal")
            || label.contains("not ")
            || label.contains("don't know")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymptomNode {
    pub id: &'static str,
    pub text: Localized,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why: Option<&'static str>,
    pub kind: NodeKind,
    /// Set on duration-typed nodes: the day threshold the options split on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_threshold: Option<u32>,
    pub options: Vec<SymptomOption>,
}

impl SymptomNode {
    pub fn is_terminal(&self) -> bool {
        self.options.is_empty()
    }

    pub fn is_duration(&self) -> bool {
        self.duration_threshold.is_some()
    }

    /// The designated lowest-risk option
    pub fn safe_exit(&self) -> Option<usize> {
        self.options.len().checked_sub(1)
    }

    /// Option chosen for skip / unsure / no: the first negative answer, else the safe exit
    pub fn escape_target(&self) -> Option<usize> {
        self.options
            .iter()
            .position(SymptomOption::is_negative)
            .or_else(|| self.safe_exit())
    }

    /// First option whose day condition holds, else the safe exit
    pub fn resolve_duration(&self, days: u32) -> Result<usize, InterviewError> {
        if !self.is_duration() {
            return Err(InterviewError::NotDurationNode(self.id.to_string()));
        }
        self.options
            .iter()
            .position(|o| o.condition.map(|c| c.holds(days)).unwrap_or(false))
            .or_else(|| self.safe_exit())
            .ok_or_else(|| InterviewError::Terminal(self.id.to_string()))
    }
}

/// Outcome of choosing one option at one node
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub next: &'static str,
    pub score_delta: i32,
    pub tags: Vec<ClinicalTag>,
    pub answer: &'static str,
}

/// The whole interview graph
#[derive(Debug, Clone)]
pub struct SymptomGraph {
    nodes: HashMap<&'static str, SymptomNode>,
}

/// Counts reported by graph validation
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub root: &'static str,
    pub terminal: &'static str,
    pub node_count: usize,
    pub option_count: usize,
    pub max_depth: usize,
}

impl SymptomGraph {
    pub fn from_nodes(nodes: Vec<SymptomNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
        }
    }

    pub fn node(&self, id: &str) -> Result<&SymptomNode, InterviewError> {
        self.nodes
            .get(id)
            .ok_or_else(|| InterviewError::UnknownNode(id.to_string()))
    }

    pub fn root(&self) -> Result<&SymptomNode, InterviewError> {
        self.node(ROOT_NODE)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(node, option) -> (next, delta, tags, answer)`
    pub fn step(&self, node_id: &str, option_index: usize) -> Result<Step, InterviewError> {
        let node = self.node(node_id)?;
        if node.is_terminal() {
            return Err(InterviewError::Terminal(node_id.to_string()));
        }
        let option = node
            .options
            .get(option_index)
            .ok_or_else(|| InterviewError::InvalidTransition {
                node: node_id.to_string(),
                index: option_index,
                count: node.options.len(),
            })?;
        Ok(Step {
            next: option.next,
            score_delta: option.risk_score,
            tags: option.tags.clone(),
            answer: option.label.en,
        })
    }

    /// Check the structural rules every interview graph must satisfy
    ///
    /// - root and terminal exist, terminal has no options, every other node has some
    /// - every `next` names an existing node
    /// - the last option of every node is a safe exit (no tags, no positive score)
    /// - duration nodes carry a condition on every option but the safe exit
    /// - no synonym reads as skip / unsure / no unless its option is the escape target
    /// - no cycles, so any traversal ends within `node_count` steps
    pub fn validate(&self) -> Result<GraphSummary, InterviewError> {
        let invalid = |msg: String| Err(InterviewError::InvalidGraph(msg));

        if !self.nodes.contains_key(ROOT_NODE) {
            return invalid(format!("missing root node '{}'", ROOT_NODE));
        }
        match self.nodes.get(TERMINAL_NODE) {
            None => return invalid(format!("missing terminal node '{}'", TERMINAL_NODE)),
            Some(n) if !n.is_terminal() => {
                return invalid(format!("terminal node '{}' has options", TERMINAL_NODE))
            }
            _ => {}
        }

        let mut option_count = 0;
        for node in self.nodes.values() {
            if node.id != TERMINAL_NODE && node.is_terminal() {
                return invalid(format!("node '{}' has no options", node.id));
            }
            for option in &node.options {
                option_count += 1;
                if !self.nodes.contains_key(option.next) {
                    return invalid(format!(
                        "node '{}' option '{}' points to unknown node '{}'",
                        node.id, option.label.en, option.next
                    ));
                }
            }
            if let Some(last) = node.options.last() {
                if !last.tags.is_empty() || last.risk_score > 0 {
                    return invalid(format!(
                        "node '{}' last option '{}' is not a safe exit",
                        node.id, last.label.en
                    ));
                }
            }
            let escape_target = node.escape_target();
            for (index, option) in node.options.iter().enumerate() {
                if Some(index) == escape_target {
                    continue;
                }
                // The escape hatch runs first, so such a synonym could never select its option
                if let Some(synonym) = option.synonyms.iter().find(|s| reads_as_escape(s)) {
                    return invalid(format!(
                        "node '{}' option '{}' synonym '{}' is captured by the escape hatch",
                        node.id, option.label.en, synonym
                    ));
                }
            }
            if node.is_duration() {
                let conditioned = node.options.iter().filter(|o| o.condition.is_some()).count();
                if conditioned + 1 != node.options.len() {
                    return invalid(format!(
                        "duration node '{}' needs a condition on every option but the last",
                        node.id
                    ));
                }
            }
        }

        let max_depth = self.longest_path()?;

        Ok(GraphSummary {
            root: ROOT_NODE,
            terminal: TERMINAL_NODE,
            node_count: self.nodes.len(),
            option_count,
            max_depth,
        })
    }

    /// Longest root-to-node path, failing on a cycle
    fn longest_path(&self) -> Result<usize, InterviewError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done(usize),
        }

        // Iterative DFS; depth memoized per node
        let mut marks: BTreeMap<&'static str, Mark> = BTreeMap::new();
        let mut stack: Vec<(&'static str, usize)> = vec![(ROOT_NODE, 0)];
        marks.insert(ROOT_NODE, Mark::Active);

        while let Some((id, child)) = stack.pop() {
            let node = self.node(id)?;
            if let Some(option) = node.options.get(child) {
                stack.push((id, child + 1));
                match marks.get(option.next) {
                    Some(Mark::Active) => {
                        return Err(InterviewError::InvalidGraph(format!(
                            "cycle through '{}' -> '{}'",
                            id, option.next
                        )))
                    }
                    Some(Mark::Done(_)) => {}
                    None => {
                        marks.insert(option.next, Mark::Active);
                        stack.push((option.next, 0));
                    }
                }
            } else {
                let depth = node
                    .options
                    .iter()
                    .filter_map(|o| match marks.get(o.next) {
                        Some(Mark::Done(d)) => Some(d + 1),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0);
                marks.insert(id, Mark::Done(depth));
            }
        }

        match marks.get(ROOT_NODE) {
            Some(Mark::Done(depth)) => Ok(*depth),
            _ => Err(InterviewError::InvalidGraph("root never completed".to_string())),
        }
    }

    /// The built-in respiratory screening interview
    pub fn standard() -> Self {
        use ClinicalTag as T;
        use Signal as S;
        type O = SymptomOption;

        const YES: &[&str] = &[
            "yes", "ha", "haan", "yeah", "correct", "right", "sure", "yep", "ok", "positive",
        ];
        const NO: &[&str] = &["no", "nah", "nope", "negative", "never", "nothing", "normal"];

        let node = |id, en, hi, why, kind, options| SymptomNode {
            id,
            text: Localized { en, hi },
            why,
            kind,
            duration_threshold: None,
            options,
        };

        let mut nodes = vec![
            node(
                ROOT_NODE,
                "What is the patient's primary complaint?",
                "रोगी की मुख्य शिकायत क्या है?",
                Some("Determines the primary clinical pathway."),
                NodeKind::SingleChoice,
                vec![
                    O::new("Cough", "खांसी", "cough_duration")
                        .score(5)
                        .signals(&[S::CoughAcute])
                        .synonyms(&["cough", "khas", "khansi", "sputum", "phlegm", "cold"]),
                    O::new("Fever", "बुखार", "fever_duration")
                        .score(5)
                        .signals(&[S::FeverAcute])
                        .synonyms(&["fever", "bukhar", "temp", "hot", "warm", "shivering"]),
                    O::new("Difficulty Breathing", "सांस लेने में तकलीफ", "breath_context")
                        .score(10)
                        .tags(&[T::Dyspnea])
                        .signals(&[S::DifficultyBreathing])
                        .synonyms(&[
                            "breath",
                            "breathing",
                            "saans",
                            "dyspnea",
                            "shortness",
                            "hard to breathe",
                            "gasping",
                        ]),
                    O::new("Chest Pain", "छाती में दर्द", "pain_nature")
                        .score(10)
                        .synonyms(&["pain", "dard", "chest", "stabbing", "hurts"]),
                    O::new("Weakness / Weight Loss", "कमजोरी / वजन घटना", "appetite_check")
                        .score(5)
                        .synonyms(&["weak", "weakness", "kamzori", "tired", "fatigue", "weight"]),
                    O::new("Routine Checkup / Other", "सामान्य जांच / अन्य", "history_check")
                        .synonyms(&["checkup", "routine", "other"]),
                ],
            ),
            // Cough and sputum
            SymptomNode {
                duration_threshold: Some(14),
                ..node(
                    "cough_duration",
                    "How long has the patient had the cough?",
                    "रोगी को खांसी कब से है?",
                    Some("Chronic cough (>2 weeks) is the primary screening criterion for tuberculosis."),
                    NodeKind::SingleChoice,
                    vec![
                        O::new("Less than 2 weeks", "2 सप्ताह से कम", "sputum_check")
                            .score(5)
                            .tags(&[T::Acute])
                            .signals(&[S::CoughAcute])
                            .when(DayCondition::AtMost(14))
                            .synonyms(&["less than", "few days", "recent"]),
                        O::new("More than 2 weeks", "2 सप्ताह से अधिक", "hemoptysis_check")
                            .score(25)
                            .tags(&[T::Chronic, T::TbFlag])
                            .signals(&[S::CoughChronic])
                            .when(DayCondition::MoreThan(14))
                            .synonyms(&["more than", "long time", "months", "weeks"]),
                        O::new("Unsure / Recent", "पता नहीं / अभी हाल ही में", "sputum_check")
                            .synonyms(&["unsure"]),
                    ],
                )
            },
            node(
                "hemoptysis_check",
                "Is there ANY blood in the sputum (Hemoptysis)?",
                "क्या बलगम में खून आ रहा है?",
                Some("Critical red flag: indicates tissue destruction (TB, cancer) or pulmonary embolism."),
                NodeKind::Boolean,
                vec![
                    O::new("Yes", "हाँ", "night_sweats_check")
                        .score(50)
                        .tags(&[T::Critical, T::TbHighRisk])
                        .signals(&[S::BloodInSputum])
                        .synonyms(&["yes", "ha", "haan", "blood", "red", "khoon", "bleeding", "hemoptysis"]),
                    O::new("No", "नहीं", "sputum_check")
                        .synonyms(&["no", "nahi", "clear", "white", "yellow", "green"]),
                ],
            ),
            node(
                "sputum_check",
                "Describe the nature of the cough/sputum.",
                "खांसी/बलगम की प्रकृति कैसी है?",
                Some("Sputum consistency differentiates bacterial, viral and allergic causes."),
                NodeKind::SingleChoice,
                vec![
                    O::new("Dry / Hacking", "सूखी / धास वाली", "breath_wheeze")
                        .synonyms(&["dry", "sukhi", "hacking", "without phlegm"]),
                    O::new("Productive (Has Sputum)", "बलगम वाली", "sputum_color")
                        .score(10)
                        .synonyms(&["wet", "phlegm", "balgam", "mucus", "productive", "thick", "coming out"]),
                    O::new("No Cough / Normal", "खांसी नहीं है", "fever_check"),
                ],
            ),
            node(
                "sputum_color",
                "What is the color of the sputum?",
                "बलगम का रंग क्या है?",
                Some("Yellow/green suggests infection, rusty suggests pneumonia, pink/frothy suggests pulmonary edema."),
                NodeKind::SingleChoice,
                vec![
                    O::new("Clear / White", "साफ / सफेद", "fever_check")
                        .synonyms(&["clear", "white", "saaf", "saliva"]),
                    O::new("Yellow / Green (Pus)", "पीला / हरा", "fever_check")
                        .score(15)
                        .tags(&[T::Bacterial])
                        .synonyms(&["yellow", "green", "peela", "hara", "pus"]),
                    O::new("Rusty / Brown", "जंग जैसा / भूरा", "fever_check")
                        .score(20)
                        .tags(&[T::PneumoniaRisk])
                        .synonyms(&["rusty", "brown", "reddish", "blood-stained"]),
                    O::new("Pink / Frothy", "गुलाबी / झागदार", "breath_context")
                        .score(30)
                        .tags(&[T::EdemaRisk])
                        .synonyms(&["pink", "frothy", "foam", "bubbles"]),
                    O::new("Don't Know / Not Seen", "पता नहीं / नहीं देखा", "fever_check"),
                ],
            ),
            // Fever and infection
            node(
                "fever_check",
                "Does the patient currently have a fever?",
                "क्या रोगी को अभी बुखार है?",
                None,
                NodeKind::Boolean,
                vec![
                    O::new("Yes", "हाँ", "fever_severity")
                        .score(10)
                        .signals(&[S::FeverAcute])
                        .synonyms(YES),
                    O::new("No", "नहीं", "appetite_check").synonyms(NO),
                ],
            ),
            node(
                "fever_severity",
                "Describe the fever pattern.",
                "बुखार कैसा है?",
                Some("High grade with chills suggests pneumonia or malaria; low grade with evening rise is typical of TB."),
                NodeKind::SingleChoice,
                vec![
                    O::new("High Grade with Chills/Shivering", "तेज बुखार और कंपकंपी", "breath_context")
                        .score(20)
                        .tags(&[T::AcuteInfection])
                        .synonyms(&["high", "shivering", "chills", "shaking", "tez", "tezz"]),
                    O::new("Low Grade (mostly evenings)", "हल्का बुखार (शाम को)", "fever_duration")
                        .score(15)
                        .tags(&[T::TbPattern])
                        .synonyms(&["low", "evening", "evenings", "halka"]),
                    O::new("Mild / Constant", "हल्का / लगातार", "fever_duration")
                        .score(10)
                        .synonyms(&["mild", "constant"]),
                    O::new("Not Measured / Unsure", "नापा नहीं / पता नहीं", "fever_duration"),
                ],
            ),
            SymptomNode {
                duration_threshold: Some(5),
                ..node(
                    "fever_duration",
                    "How long has the fever persisted?",
                    "बुखार कब से है?",
                    Some("Fever lasting more than 5 days is an infection that is not resolving."),
                    NodeKind::SingleChoice,
                    vec![
                        O::new("Less than 5 days", "5 दिन से कम", "breath_context")
                            .score(5)
                            .signals(&[S::FeverAcute])
                            .when(DayCondition::AtMost(5))
                            .synonyms(&["less than", "few days", "recent"]),
                        O::new("More than 5 days", "5 दिन से अधिक", "night_sweats_check")
                            .score(15)
                            .tags(&[T::PersistentFever])
                            .signals(&[S::FeverPersistent])
                            .when(DayCondition::MoreThan(5))
                            .synonyms(&["more than", "long time", "weeks"]),
                        O::new("Don't Know / Variable", "पता नहीं", "breath_context")
                            .synonyms(&["variable"]),
                    ],
                )
            },
            // Constitutional
            node(
                "night_sweats_check",
                "Does the patient experience drenching night sweats?",
                "क्या रोगी को रात में कपड़े भिगोने वाला पसीना आता है?",
                Some("A hallmark sign of tuberculosis, often ignored."),
                NodeKind::Boolean,
                vec![
                    O::new("Yes", "हाँ", "appetite_check")
                        .score(20)
                        .tags(&[T::TbFlag])
                        .signals(&[S::NightSweats])
                        .synonyms(&["yes", "ha", "haan", "sweat", "sweating", "drenched", "pasina"]),
                    O::new("No", "नहीं", "appetite_check").synonyms(NO),
                ],
            ),
            node(
                "appetite_check",
                "Has there been a significant loss of appetite (Anorexia)?",
                "क्या भूख कम लग रही है?",
                Some("Loss of appetite is an early constitutional symptom of TB and chronic lung disease."),
                NodeKind::Boolean,
                vec![
                    O::new("Yes", "हाँ", "weight_loss_check")
                        .score(15)
                        .tags(&[T::Anorexia])
                        .synonyms(&["yes", "ha", "haan", "bhookh", "not hungry", "poor appetite", "loss of appetite"]),
                    O::new("No", "नहीं", "weight_loss_check").synonyms(NO),
                ],
            ),
            node(
                "weight_loss_check",
                "Is there noticeable, unintentional weight loss?",
                "क्या बिना कारण वजन कम हुआ है?",
                Some("Wasting suggests chronic active TB, malignancy, or advanced COPD."),
                NodeKind::Boolean,
                vec![
                    O::new("Yes (Clothes fit loose)", "हाँ (कपड़े ढीले हो गए)", "history_check")
                        .score(20)
                        .tags(&[T::ChronicWasting])
                        .signals(&[S::WeightLoss])
                        .synonyms(&["yes", "ha", "haan", "lost", "thin", "wajan", "kam hua", "clothes loose", "skinny"]),
                    O::new("No", "नहीं", "history_check")
                        .synonyms(&["no", "nahi", "same", "normal", "stable"]),
                ],
            ),
            // Breathing and emergencies
            node(
                "breath_context",
                "When does the breathlessness happen?",
                "सांस फूलना कब शुरू होता है?",
                Some("Differentiates asthma/COPD (exertion) from pneumonia or failure (rest)."),
                NodeKind::SingleChoice,
                vec![
                    O::new("Only on heavy exertion", "भारी काम करने पर", "breath_wheeze")
                        .score(10)
                        .signals(&[S::DifficultyBreathing])
                        .synonyms(&["exertion", "work", "exercise", "running", "walking fast"]),
                    O::new("On walking level ground", "सीधा चलने पर", "breath_wheeze")
                        .score(20)
                        .tags(&[T::ModerateDyspnea])
                        .signals(&[S::DifficultyBreathing])
                        .synonyms(&["walking", "stairs", "climbing"]),
                    O::new("At rest / While sitting", "बैठे-बैठे भी", "cyanosis_check")
                        .score(30)
                        .tags(&[T::SevereDyspnea, T::Urgent])
                        .signals(&[S::DifficultyBreathing])
                        .synonyms(&["sitting", "lying", "bed", "rest", "resting", "all the time"]),
                    O::new("No Breathlessness / Normal", "सांस नहीं फूलती / सामान्य", "breath_wheeze")
                        .synonyms(&["normal", "none", "fine", "ok"]),
                ],
            ),
            node(
                "breath_wheeze",
                "Is there a whistling sound (Wheeze) when breathing?",
                "क्या सांस लेते समय सीटी जैसी आवाज आती है?",
                Some("Wheezing indicates airway obstruction (asthma, COPD)."),
                NodeKind::Boolean,
                vec![
                    O::new("Yes", "हाँ", "history_check")
                        .score(15)
                        .tags(&[T::AirwayObstruction])
                        .synonyms(&["yes", "ha", "haan", "whistle", "whistling", "wheeze", "seeti"]),
                    O::new("No", "नहीं", "history_check").synonyms(NO),
                ],
            ),
            node(
                "cyanosis_check",
                "Are the lips or fingertips turning blue (Cyanosis)?",
                "क्या होंठ या उंगलियां नीली पड़ रही हैं?",
                Some("Medical emergency: indicates severe hypoxia."),
                NodeKind::Boolean,
                vec![
                    O::new("Yes", "हाँ", TERMINAL_NODE)
                        .score(100)
                        .tags(&[T::Emergency, T::Hypoxia])
                        .synonyms(&["yes", "ha", "haan", "blue", "lips", "fingers", "nails", "neela"]),
                    // Continues to the wheeze check; chest pain is asked from the root pathway only
                    O::new("No", "नहीं", "breath_wheeze")
                        .synonyms(&["no", "nahi", "normal", "pink"]),
                ],
            ),
            node(
                "pain_nature",
                "Describe the chest pain.",
                "छाती के दर्द का वर्णन करें।",
                None,
                NodeKind::SingleChoice,
                vec![
                    O::new("Sharp pain on deep breath", "गहरी सांस लेने पर चुभन", "cough_duration")
                        .score(15)
                        .tags(&[T::Pleuritic])
                        .synonyms(&["sharp", "stabbing", "deep breath", "chubhan"]),
                    O::new("Heavy / Crushing pressure", "भारीपन / दबाव", TERMINAL_NODE)
                        .score(30)
                        .tags(&[T::CardiacRedFlag])
                        .signals(&[S::SevereChestPain])
                        .synonyms(&["heavy", "crushing", "pressure", "tight", "bhaari"]),
                    O::new("No Pain", "दर्द नहीं", "history_check"),
                ],
            ),
            // Risk factors and occupation
            node(
                "history_check",
                "Does the patient smoke or have previous TB history?",
                "क्या रोगी धूम्रपान करता है या पुरानी टीबी है?",
                None,
                NodeKind::MultiChoice,
                vec![
                    O::new("Previous TB Treatment", "पुरानी टीबी का इलाज", "occupation_check")
                        .score(20)
                        .tags(&[T::RelapseRisk])
                        .synonyms(&["tb", "tuberculosis", "treatment", "dots"]),
                    O::new("Current Smoker", "वर्तमान धूम्रपान करने वाला", "occupation_check")
                        .score(15)
                        .tags(&[T::CopdRisk])
                        .synonyms(&["smoke", "smoker", "smoking", "bidi", "cigarette", "copd"]),
                    O::new("None", "कुछ नहीं", "occupation_check"),
                ],
            ),
            node(
                "occupation_check",
                "Does the patient work in dusty environments (Mines, Stone Crushing, Cotton)?",
                "क्या रोगी धूल वाली जगह (खान, पत्थर क्रशर, कपास) में काम करता है?",
                Some("Screens for silicosis, asbestosis and occupational lung disease common in rural laborers."),
                NodeKind::Boolean,
                vec![
                    O::new("Yes", "हाँ", TERMINAL_NODE)
                        .score(15)
                        .tags(&[T::OccupationalHazard])
                        .synonyms(&["yes", "ha", "haan", "mine", "mines", "dust", "dusty", "stone", "cotton", "quarry"]),
                    O::new("No", "नहीं", TERMINAL_NODE).synonyms(NO),
                ],
            ),
        ];

        nodes.push(node(
            TERMINAL_NODE,
            "Assessment Complete. Please confirm the profile below.",
            "मूल्यांकन पूरा हुआ। कृपया नीचे दिए गए प्रोफाइल की पुष्टि करें।",
            None,
            NodeKind::Info,
            Vec::new(),
        ));

        Self::from_nodes(nodes)
    }
}

/// Client-facing view of one node in one language
#[derive(Debug, Clone, Serialize)]
pub struct NodePrompt {
    pub node_id: &'static str,
    pub text: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why: Option<&'static str>,
    pub kind: NodeKind,
    pub is_duration: bool,
    pub options: Vec<&'static str>,
    pub terminal: bool,
}

impl NodePrompt {
    pub fn new(node: &SymptomNode, language: Language) -> Self {
        Self {
            node_id: node.id,
            text: node.text.get(language),
            why: node.why,
            kind: node.kind,
            is_duration: node.is_duration(),
            options: node.options.iter().map(|o| o.label.get(language)).collect(),
            terminal: node.is_terminal(),
        }
    }
}
