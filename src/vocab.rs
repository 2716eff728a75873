//! Closed vocabularies shared by the extractor, the classifier and search.
//!
//! Keyword lists are written in natural orthography and folded once, on
//! first use, so lookups always compare normalized text with normalized text.

use crate::normalize::normalize;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A keyword list folded through the normalizer.
#[derive(Debug, Clone)]
pub struct KeywordGroup(Vec<String>);

impl KeywordGroup {
    pub fn new(words: &[&str]) -> Self {
        Self(words.iter().map(|w| normalize(w)).collect())
    }

    /// Number of keywords contained in `text` (already normalized).
    pub fn hits(&self, text: &str) -> usize {
        self.0.iter().filter(|k| text.contains(k.as_str())).count()
    }

    pub fn any_in(&self, text: &str) -> bool {
        self.0.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn first_in(&self, text: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|k| text.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }
}

// --- Facilities ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    School,
    Hospital,
    Park,
    Supermarket,
    Mall,
}

impl FacilityKind {
    /// Declaration order; ties in keyword scoring resolve to the earlier kind.
    pub const ALL: [FacilityKind; 5] = [
        FacilityKind::School,
        FacilityKind::Hospital,
        FacilityKind::Park,
        FacilityKind::Supermarket,
        FacilityKind::Mall,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FacilityKind::School => "مدرسة",
            FacilityKind::Hospital => "مستشفى",
            FacilityKind::Park => "حديقة",
            FacilityKind::Supermarket => "سوبرماركت",
            FacilityKind::Mall => "مول",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            FacilityKind::School => "المدارس",
            FacilityKind::Hospital => "المستشفيات والمراكز الطبية",
            FacilityKind::Park => "الحدائق والمتنزهات",
            FacilityKind::Supermarket => "محلات السوبرماركت",
            FacilityKind::Mall => "المولات ومراكز التسوق",
        }
    }

    /// File stem used by the JSON store.
    pub fn file_stem(self) -> &'static str {
        match self {
            FacilityKind::School => "schools",
            FacilityKind::Hospital => "hospitals",
            FacilityKind::Park => "parks",
            FacilityKind::Supermarket => "supermarkets",
            FacilityKind::Mall => "malls",
        }
    }

    pub fn keywords(self) -> &'static KeywordGroup {
        &FACILITY_KEYWORDS[self as usize]
    }

    /// Accepts the Arabic label, the snake_case name or the file stem.
    pub fn parse(value: &str) -> Option<Self> {
        let wanted = normalize(value.trim());
        Self::ALL.into_iter().find(|kind| {
            normalize(kind.label()) == wanted
                || kind.file_stem() == wanted
                || format!("{:?}", kind).to_lowercase() == wanted
        })
    }

    /// Highest keyword overlap wins; ties go to declaration order.
    pub fn score(text: &str) -> Option<Self> {
        let mut best: Option<(FacilityKind, usize)> = None;
        for kind in Self::ALL {
            let hits = kind.keywords().hits(text);
            if hits == 0 {
                continue;
            }
            match best {
                Some((_, best_hits)) if hits <= best_hits => {}
                _ => best = Some((kind, hits)),
            }
        }
        best.map(|(kind, _)| kind)
    }

    /// First kind, in declaration order, with any keyword present.
    pub fn first_mentioned(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.keywords().any_in(text))
    }
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

static FACILITY_KEYWORDS: Lazy<[KeywordGroup; 5]> = Lazy::new(|| {
    [
        KeywordGroup::new(&[
            "مدرسة", "مدارس", "روضة", "روضات", "كلية", "كليات", "معهد", "معاهد", "جامعة",
            "جامعات", "ابتدائية", "متوسطة", "ثانوية", "تعليم", "دراسة", "أكاديمية",
        ]),
        KeywordGroup::new(&[
            "مستشفى", "مستشفيات", "مركز طبي", "مراكز طبية", "عيادة", "عيادات", "مستوصف",
            "مستوصفات", "مجمع طبي", "مجمعات طبية", "صحة", "طبي", "علاج", "طوارئ", "مختبر",
            "صيدلية",
        ]),
        KeywordGroup::new(&[
            "حديقة", "حدائق", "منتزه", "منتزهات", "متنزه", "متنزهات", "ملعب", "ملاعب", "ساحة",
            "ساحات", "مساحة خضراء", "مساحات خضراء", "بارك", "حدائق عامة",
        ]),
        KeywordGroup::new(&[
            "سوبرماركت", "هايبر", "هايبرماركت", "ماركت", "سوق", "أسواق", "بقالة", "محل", "متجر",
            "دكان", "تموينات", "جمعية", "مخبز", "مخابز", "بقالات", "محلات",
        ]),
        KeywordGroup::new(&[
            "مول", "مولات", "مركز تسوق", "مراكز تسوق", "مجمع تجاري", "مجمعات تجارية", "بلازا",
            "سوق تجاري", "أسواق تجارية", "سنتر", "مجمع", "معرض", "معارض",
        ]),
    ]
});

/// Nouns that mark a message as being about facilities in general.
pub static FACILITY_NOUNS: Lazy<KeywordGroup> = Lazy::new(|| {
    KeywordGroup::new(&[
        "مدرسة", "مدارس", "مستشفى", "مستشفيات", "حديقة", "حدائق", "سوبرماركت", "مول", "مولات",
        "مرافق", "خدمات",
    ])
});

// --- Housing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    Villa,
    Land,
    Commercial,
}

impl PropertyType {
    pub const ALL: [PropertyType; 4] = [
        PropertyType::Apartment,
        PropertyType::Villa,
        PropertyType::Land,
        PropertyType::Commercial,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PropertyType::Apartment => "شقة",
            PropertyType::Villa => "فيلا",
            PropertyType::Land => "أرض",
            PropertyType::Commercial => "تجاري",
        }
    }

    pub fn keywords(self) -> &'static KeywordGroup {
        &PROPERTY_KEYWORDS[self as usize]
    }

    pub fn detect(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.keywords().any_in(text))
    }
}

static PROPERTY_KEYWORDS: Lazy<[KeywordGroup; 4]> = Lazy::new(|| {
    [
        KeywordGroup::new(&["شقة", "شقق", "دور", "دوبلكس", "استديو", "روف", "ملحق", "غرفة"]),
        KeywordGroup::new(&["فيلا", "فلل", "قصر", "شاليه", "استراحة", "بيت"]),
        KeywordGroup::new(&["أرض", "قطعة", "أراضي", "مخطط"]),
        KeywordGroup::new(&["محل", "عمارة", "مكتب", "معرض", "مستودع", "تجاري", "مول"]),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Rent,
    Purchase,
}

impl TransactionType {
    pub fn label(self) -> &'static str {
        match self {
            TransactionType::Rent => "إيجار",
            TransactionType::Purchase => "تمليك",
        }
    }

    pub fn detect(text: &str) -> Option<Self> {
        if RENT_KEYWORDS.any_in(text) {
            Some(TransactionType::Rent)
        } else if PURCHASE_KEYWORDS.any_in(text) {
            Some(TransactionType::Purchase)
        } else {
            None
        }
    }
}

static RENT_KEYWORDS: Lazy<KeywordGroup> = Lazy::new(|| {
    KeywordGroup::new(&[
        "إيجار", "ايجار", "استئجار", "أجرة", "اجار", "ايجارات", "للايجار", "للإيجار", "مستأجر",
    ])
});

static PURCHASE_KEYWORDS: Lazy<KeywordGroup> = Lazy::new(|| {
    KeywordGroup::new(&["تمليك", "شراء", "بيع", "تملك", "امتلاك", "ملك", "للبيع", "مالك"])
});

pub static HOUSING_TRIGGERS: Lazy<KeywordGroup> = Lazy::new(|| {
    KeywordGroup::new(&[
        "أبحث عن", "أريد", "أبغى", "محتاج", "بحاجة", "أدور على", "عقار", "سكن", "شقة", "فيلا",
        "بيت", "منزل", "استأجر", "اشتري",
    ])
});

pub static HOUSING_NOUNS: Lazy<KeywordGroup> =
    Lazy::new(|| KeywordGroup::new(&["سكن", "عقار", "منزل", "بيت", "شقة", "فيلا"]));

pub fn any_transaction_keyword(text: &str) -> bool {
    RENT_KEYWORDS.any_in(text) || PURCHASE_KEYWORDS.any_in(text)
}

// --- Person ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    const ALL: [MaritalStatus; 4] = [
        MaritalStatus::Single,
        MaritalStatus::Married,
        MaritalStatus::Divorced,
        MaritalStatus::Widowed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MaritalStatus::Single => "أعزب",
            MaritalStatus::Married => "متزوج",
            MaritalStatus::Divorced => "مطلق",
            MaritalStatus::Widowed => "أرمل",
        }
    }

    /// "غير متزوج" contains "متزوج", so single is checked first.
    pub fn detect(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| MARITAL_KEYWORDS[*status as usize].any_in(text))
    }
}

static MARITAL_KEYWORDS: Lazy<[KeywordGroup; 4]> = Lazy::new(|| {
    [
        KeywordGroup::new(&["اعزب", "أعزب", "عازب", "غير متزوج"]),
        KeywordGroup::new(&["متزوج", "مرتبط"]),
        KeywordGroup::new(&["مطلق", "منفصل"]),
        KeywordGroup::new(&["أرمل", "ارمل"]),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Center,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Center,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "شمال",
            Direction::South => "جنوب",
            Direction::East => "شرق",
            Direction::West => "غرب",
            Direction::Center => "وسط",
        }
    }

    pub fn variants(self) -> &'static KeywordGroup {
        &DIRECTION_KEYWORDS[self as usize]
    }
}

static DIRECTION_KEYWORDS: Lazy<[KeywordGroup; 5]> = Lazy::new(|| {
    [
        KeywordGroup::new(&["شمال", "الشمال", "شمالي", "الشمالي", "الشمالية"]),
        KeywordGroup::new(&["جنوب", "الجنوب", "جنوبي", "الجنوبي", "الجنوبية"]),
        KeywordGroup::new(&["شرق", "الشرق", "شرقي", "الشرقي", "الشرقية"]),
        KeywordGroup::new(&["غرب", "الغرب", "غربي", "الغربي", "الغربية"]),
        KeywordGroup::new(&["وسط", "الوسط", "وسطى", "المركز"]),
    ]
});

// --- Conversation ---

pub static RECOMMENDATION_TRIGGERS: Lazy<KeywordGroup> = Lazy::new(|| {
    KeywordGroup::new(&[
        "اقترح", "أقترح", "توصية", "أوصي", "رأيك", "رأيكم", "تنصح", "تنصحون", "أفضل حي",
        "أنسب حي", "حي مناسب", "أفضل منطقة", "أين أسكن", "دلني", "خبرني", "اخبرني", "انصحني",
        "ابحث عن حي", "حي يناسب", "يناسبني", "اريد حي", "ابي حي", "ابغى حي",
    ])
});

pub static CONTINUATION_KEYWORDS: Lazy<KeywordGroup> = Lazy::new(|| {
    KeywordGroup::new(&[
        "نعم", "المزيد", "اريد", "أكمل", "تابع", "استمر", "موافق", "تمام", "اوكي", "اوك", "ok",
        "اكيد", "ايوه",
    ])
});

pub static PROXIMITY_PHRASES: &[&str] = &[
    "قريب من", "قريبة من", "بالقرب من", "جنب", "بجانب", "جوار", "بجوار", "حول",
];

/// Words that a pattern may capture where a neighborhood name was expected.
pub static COMMON_WORDS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "فيه", "فيها", "به", "بها", "هذا", "هذه", "ذلك", "تلك", "من", "إلى", "على", "في", "عن",
        "مع", "حول", "قرب", "بجانب",
    ]
    .iter()
    .map(|w| normalize(w))
    .collect()
});

pub fn is_common_word(word: &str) -> bool {
    COMMON_WORDS.iter().any(|w| w == word)
}
