//! Reply rendering. Kept deliberately plain: every answer that is about a
//! neighborhood names it, which is what the context resolver reads back.

use crate::entities::Entities;
use crate::normalize::{normalize, strip_district_prefix};
use crate::recommend::{price_tier, BudgetRecommendation, Recommendation};
use crate::search::SearchHit;
use crate::store::{FacilityRecord, NeighborhoodRecord};
use crate::vocab::{FacilityKind, TransactionType};
use log::debug;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;

pub const EMPTY_PROMPT: &str = "كيف يمكنني مساعدتك في البحث عن عقار أو حي مناسب أو المرافق المتوفرة؟";

pub const ERROR_TEXT: &str = "عذراً، حدث خطأ ما. هل يمكنك إعادة صياغة طلبك من فضلك؟";

pub const ASK_FOR_NEIGHBORHOOD: &str = "يرجى تحديد الحي الذي تريد معرفة المرافق فيه.";

const OPENINGS: [&str; 3] = [
    "إليك معلومات عن حي {name}:",
    "حي {name} من الأحياء التي قد تناسبك، وإليك أبرز ما يميزه:",
    "هذه نبذة عن حي {name}:",
];

const DESCRIPTION_FIELDS: [&str; 4] = ["description", "الوصف", "وصف", "نبذة"];

const MAX_BENEFITS: usize = 4;
const HIGHLIGHTS_PER_KIND: usize = 3;

static NEGATIVE_MARKERS: Lazy<Vec<String>> = Lazy::new(|| {
    ["لا ", "غير ", "سيء", "مشكلة", "ازدحام", "زحمة", "بعيد"]
        .iter()
        .map(|w| normalize(w))
        .collect()
});

/// 8000 -> "8,000"
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Splits benefit snippets into short positive sentences.
fn benefit_sentences(benefits: &[String]) -> Vec<String> {
    benefits
        .iter()
        .flat_map(|b| b.split(['.', '،', ',', '؛', '\n']))
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() >= 2)
        .filter(|s| {
            let folded = normalize(s);
            !NEGATIVE_MARKERS.iter().any(|m| folded.contains(m.as_str()))
        })
        .take(MAX_BENEFITS)
        .map(str::to_string)
        .collect()
}

pub fn neighborhood_overview(
    name: &str,
    record: Option<&NeighborhoodRecord>,
    benefits: &[String],
) -> String {
    let name = strip_district_prefix(name);
    let opening = OPENINGS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(OPENINGS[0]);
    let mut lines = vec![opening.replace("{name}", name)];

    if let Some(record) = record {
        if let Some((_, description)) = record.first_text(&DESCRIPTION_FIELDS) {
            lines.push(description);
        }
        match price_tier(record) {
            Ok(tier) => lines.push(format!("مستوى الأسعار: {}.", tier.label())),
            Err(err) => debug!("no price line for {}: {}", name, err),
        }
    }

    let sentences = benefit_sentences(benefits);
    if !sentences.is_empty() {
        lines.push("ما يذكره السكان:".to_string());
        lines.extend(sentences.iter().map(|s| format!("- {}", s)));
    }

    lines.push(format!("هل تريد معرفة المزيد عن المرافق في حي {}؟", name));
    lines.join("\n")
}

pub fn recommendation(
    rec: &Recommendation,
    record: Option<&NeighborhoodRecord>,
    benefits: &[String],
) -> String {
    format!(
        "أقترح عليك حي {}.\n{}",
        rec.neighborhood,
        neighborhood_overview(&rec.neighborhood, record, benefits)
    )
}

pub fn budget(income: u64, result: &BudgetRecommendation) -> String {
    let names = result
        .neighborhoods
        .iter()
        .map(|n| format!("حي {}", n))
        .collect::<Vec<_>>()
        .join("، ");
    if result.sampled {
        return format!(
            "لم أجد أحياء مصنفة ضمن المستوى السعري المناسب لدخل {} ريال، لكن أقترح عليك النظر في: {}.",
            group_thousands(income),
            names
        );
    }
    format!(
        "بناءً على دخلك ({} ريال) تناسبك الأحياء ذات المستوى السعري {} أو أقل بقليل. أقترح عليك: {}.",
        group_thousands(income),
        result.tier.label(),
        names
    )
}

/// Every facility found in a neighborhood, optionally of one kind.
pub fn facilities_in(name: &str, kind: Option<FacilityKind>, records: &[FacilityRecord]) -> String {
    let name = strip_district_prefix(name);
    if records.is_empty() {
        let what = kind.map(FacilityKind::plural).unwrap_or("مرافق");
        return format!("لم يتم العثور على {} في {}.", what, name);
    }
    let heading = match kind {
        Some(kind) => format!("{} في حي {}:", kind.plural(), name),
        None => format!("جميع المرافق المتوفرة في {}:", name),
    };
    let mut lines = vec![heading];
    lines.extend(records.iter().map(|r| match kind {
        Some(_) => format!("- {}", r.name),
        None => format!("- {} ({})", r.name, r.facility_type.label()),
    }));
    lines.join("\n")
}

/// A few facilities of each kind.
pub fn facility_highlights(name: &str, records: &[FacilityRecord]) -> String {
    let name = strip_district_prefix(name);
    if records.is_empty() {
        return format!("لم يتم العثور على مرافق في {}.", name);
    }
    let mut lines = vec![format!("إليك أبرز المرافق في {}:", name)];
    for kind in FacilityKind::ALL {
        let names: Vec<&str> = records
            .iter()
            .filter(|r| r.facility_type == kind)
            .take(HIGHLIGHTS_PER_KIND)
            .map(|r| r.name.as_str())
            .collect();
        if !names.is_empty() {
            lines.push(format!("{}: {}", kind.plural(), names.join("، ")));
        }
    }
    lines.join("\n")
}

pub fn search_hit(hit: &SearchHit) -> String {
    let mut lines = vec![format!(
        "وجدت {} نتيجة ضمن {} عند البحث عن \"{}\":",
        hit.total,
        hit.kind.plural(),
        hit.query
    )];
    for record in &hit.records {
        match record.neighborhood.as_deref() {
            Some(n) => lines.push(format!("- {} في حي {}", record.name, strip_district_prefix(n))),
            None => lines.push(format!("- {}", record.name)),
        }
    }
    if hit.total > hit.records.len() {
        lines.push(format!("هذه أول {} نتائج.", hit.records.len()));
    }
    lines.join("\n")
}

pub fn search_miss(query: &str) -> String {
    format!(
        "لم أتمكن من العثور على \"{}\". هل يمكنك كتابة الاسم بطريقة أخرى أو ذكر الحي الذي يقع فيه؟",
        query.trim()
    )
}

pub fn facility_follow_up(kind: FacilityKind) -> String {
    let label = kind.label();
    format!(
        "للبحث عن {} محددة، أرجو كتابة اسم {} أو الحي الذي تريد البحث فيه.",
        label, label
    )
}

/// The facility table exists but nothing in it says where each row is.
pub fn unlocatable(kind: FacilityKind) -> String {
    format!("لا تتوفر معلومات الأحياء في بيانات {} حالياً.", kind.plural())
}

/// Housing answer: the recommendation phrased around what the user asked
/// for, followed by nearby facilities of each requested kind.
pub fn housing(
    entities: &Entities,
    rec: &Recommendation,
    nearby: &[(FacilityKind, Vec<FacilityRecord>)],
) -> String {
    let property = entities
        .housing
        .property_type
        .map(|p| p.label())
        .unwrap_or("عقار");
    let transaction = match entities.housing.transaction_type.unwrap_or(TransactionType::Rent) {
        TransactionType::Rent => "للاستئجار",
        TransactionType::Purchase => "للشراء",
    };
    let mut sentence = format!("بناءً على متطلباتك للبحث عن {} {}", property, transaction);
    if let Some(amount) = entities.budget {
        sentence.push_str(&format!(" بميزانية {} ريال", group_thousands(amount)));
    }
    let kinds: Vec<&str> = entities
        .proximity_kinds()
        .into_iter()
        .map(FacilityKind::plural)
        .collect();
    if !kinds.is_empty() {
        sentence.push_str(&format!(" بالقرب من {}", kinds.join(" و")));
    }
    sentence.push_str(&format!("، أقترح عليك النظر في حي {}.", rec.neighborhood));

    let mut lines = vec![sentence];
    for (kind, records) in nearby {
        if records.is_empty() {
            lines.push(format!("لم يتم العثور على {} في {}.", kind.plural(), rec.neighborhood));
            continue;
        }
        let names: Vec<&str> = records
            .iter()
            .take(HIGHLIGHTS_PER_KIND)
            .map(|r| r.name.as_str())
            .collect();
        lines.push(format!("{} القريبة: {}", kind.plural(), names.join("، ")));
    }
    lines.join("\n")
}
