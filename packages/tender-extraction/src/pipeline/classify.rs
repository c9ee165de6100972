//! Document type classification.
//!
//! Two independent scorers, reconciled into one verdict:
//! - Filename: weighted keyword lists matched against the ASCII-folded name
//! - Content: domain phrases counted in the leading part of the text
//!
//! Every score is explainable: each guess carries the keywords it matched.

use tracing::debug;

use crate::text::{fold_ascii, leading_chars};
use crate::types::classification::{DocumentClassification, DocumentType, TypeGuess};

/// Content shorter than this is too thin to classify.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Per-keyword occurrence cap in the content scorer.
const MAX_OCCURRENCES_PER_KEYWORD: usize = 3;

/// Filename confidence never exceeds this.
const FILENAME_CONFIDENCE_CAP: f64 = 0.95;

/// Content confidence never exceeds this.
const CONTENT_CONFIDENCE_CAP: f64 = 0.9;

/// Penalty when one scorer has no opinion.
const ONE_SIDED_PENALTY: f64 = 0.9;

/// Penalty when the scorers disagree.
const CONFLICT_PENALTY: f64 = 0.85;

/// Filename keywords and their weight for each type.
///
/// Weight reflects how unambiguous a keyword is: "teknik" names a
/// document, "ek" (attachment) names almost anything.
fn filename_keywords(doc_type: DocumentType) -> (&'static [&'static str], u8) {
    match doc_type {
        DocumentType::TechnicalSpecification => (
            &[
                "teknik",
                "şartname",
                "sartname",
                "teknik-şartname",
                "teknikşartname",
                "t.s.",
                "ts-",
                "technical",
                "spec",
            ],
            9,
        ),
        DocumentType::TenderNotice => (
            &[
                "ilan",
                "ilani",
                "duyuru",
                "announcement",
                "notice",
                "tender-notice",
                "ihaleilani",
                "ihale-ilani",
            ],
            9,
        ),
        DocumentType::AdministrativeSpecification => (
            &[
                "idari",
                "idari-şartname",
                "idarisartname",
                "administrative",
                "i.s.",
                "is-",
                "admin-spec",
            ],
            9,
        ),
        DocumentType::ContractDraft => (
            &[
                "sözleşme",
                "sozlesme",
                "taslak",
                "tasarı",
                "contract",
                "draft",
                "sozlesme-tasarisi",
                "s.t.",
            ],
            8,
        ),
        DocumentType::PriceQuoteLetter => (
            &[
                "fiyat",
                "teklif",
                "mektup",
                "price",
                "offer",
                "proposal",
                "fiyat-teklif",
                "teklif-mektubu",
                "f.t.m.",
            ],
            8,
        ),
        DocumentType::Other => (
            &[
                "ek",
                "attachment",
                "appendix",
                "annex",
                "belge",
                "document",
                "dosya",
                "file",
            ],
            3,
        ),
        DocumentType::Undetermined => (&[], 0),
    }
}

/// Domain phrases that indicate each type inside the document body.
fn content_keywords(doc_type: DocumentType) -> &'static [&'static str] {
    match doc_type {
        DocumentType::TechnicalSpecification => &[
            "teknik şartname",
            "teknik özellikler",
            "malzeme cinsi",
            "gramaj",
            "ürün özellikleri",
            "menü çeşitleri",
            "yemek gramajları",
            "hijyen standartları",
            "haccp",
            "iso 22000",
            "marka tescil belgesi",
            "gıda kodeksi",
        ],
        DocumentType::TenderNotice => &[
            "ihale ilanı",
            "kamu ihale",
            "ekap",
            "ihale kayıt numarası",
            "son teklif verme",
            "ihale tarihi",
            "ihalenin türü",
            "açık ihale",
            "bütçe",
            "yaklaşık maliyet",
            "teklif alma",
            "ilan tarihi",
        ],
        DocumentType::ContractDraft => &[
            "sözleşme tasarısı",
            "madde 1",
            "taraflar",
            "yüklenici",
            "işveren",
            "sözleşmenin konusu",
            "sözleşme bedeli",
            "ödeme şartları",
            "ceza şartları",
            "fesih",
            "uyuşmazlık",
        ],
        DocumentType::AdministrativeSpecification => &[
            "idari şartname",
            "genel şartlar",
            "özel şartlar",
            "ihalenin konusu",
            "ihalenin niteliği",
            "isteklilerde aranan şartlar",
            "teklif sunma",
            "belgeler",
            "şekli şartlar",
            "yeterlilik",
            "geçici teminat",
            "kesin teminat",
        ],
        DocumentType::PriceQuoteLetter => &[
            "fiyat teklifi",
            "teklif mektubu",
            "toplam tutar",
            "birim fiyat",
            "kdv",
            "indirim",
            "net tutar",
            "brüt tutar",
            "ödeme koşulları",
            "geçerlilik süresi",
        ],
        DocumentType::Other | DocumentType::Undetermined => &[],
    }
}

fn filename_confidence(weight: u8, hits: usize) -> f64 {
    let base = match weight {
        9.. => 0.85,
        8 => 0.75,
        5..=7 => 0.6,
        _ => 0.5,
    };
    let bonus = hits.saturating_sub(1) as f64 * 0.05;
    (base + bonus).min(FILENAME_CONFIDENCE_CAP)
}

/// Guess the document type from its filename.
///
/// The highest (weight, distinct-hit-count) pair wins. No hit at all
/// yields `Undetermined` with zero confidence.
pub fn classify_filename(filename: &str) -> TypeGuess {
    let folded = fold_ascii(filename);
    if folded.trim().is_empty() {
        return TypeGuess::undetermined();
    }

    let mut best: Option<(u8, Vec<String>, DocumentType)> = None;
    for doc_type in DocumentType::ALL {
        let (keywords, weight) = filename_keywords(doc_type);

        let mut matched: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = fold_ascii(keyword);
            if folded.contains(keyword.as_str()) && !matched.contains(&keyword) {
                matched.push(keyword);
            }
        }
        if matched.is_empty() {
            continue;
        }

        let better = match &best {
            None => true,
            Some((w, m, _)) => (weight, matched.len()) > (*w, m.len()),
        };
        if better {
            best = Some((weight, matched, doc_type));
        }
    }

    match best {
        Some((weight, matched, doc_type)) => TypeGuess {
            doc_type,
            confidence: filename_confidence(weight, matched.len()),
            matched,
        },
        None => TypeGuess::undetermined(),
    }
}

/// Guess the document type from its leading `scan_chars` characters.
pub fn classify_content(content: &str, scan_chars: usize) -> TypeGuess {
    if content.chars().count() < MIN_CONTENT_CHARS {
        return TypeGuess::undetermined();
    }

    // ASCII fold on both sides so "ISO" and "iso" meet
    let sample = fold_ascii(leading_chars(content, scan_chars));

    // (type, score, matched keywords)
    let mut scores: Vec<(DocumentType, usize, Vec<String>)> = DocumentType::ALL
        .into_iter()
        .filter_map(|doc_type| {
            let mut score = 0;
            let mut matched = Vec::new();
            for keyword in content_keywords(doc_type) {
                let occurrences = sample
                    .matches(fold_ascii(keyword).as_str())
                    .count()
                    .min(MAX_OCCURRENCES_PER_KEYWORD);
                if occurrences > 0 {
                    score += occurrences;
                    matched.push(keyword.to_string());
                }
            }
            (score > 0).then_some((doc_type, score, matched))
        })
        .collect();

    if scores.is_empty() {
        return TypeGuess::undetermined();
    }

    // Stable sort keeps the declaration order for exact ties.
    scores.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.len().cmp(&a.2.len())));

    let runner_up = scores.get(1).map(|s| s.1).unwrap_or(0);
    let (doc_type, score, matched) = scores.swap_remove(0);

    let mut confidence = match matched.len() {
        5.. => 0.8,
        3 | 4 => 0.65,
        2 => 0.5,
        _ => 0.4,
    };
    if score > runner_up * 2 {
        confidence = (confidence + 0.1_f64).min(CONTENT_CONFIDENCE_CAP);
    }

    TypeGuess {
        doc_type,
        confidence,
        matched,
    }
}

/// Combine the two scorers into one classification.
///
/// - Agreement: the average of both confidences
/// - One side undetermined: the other side, slightly penalized
/// - Disagreement: the more confident side wins, but the result is
///   penalized below *both* standalone confidences
pub fn reconcile(filename: TypeGuess, content: TypeGuess) -> DocumentClassification {
    let (doc_type, confidence) = match (
        filename.doc_type.is_determined(),
        content.doc_type.is_determined(),
    ) {
        (false, false) => (DocumentType::Undetermined, 0.0),
        (true, false) => (filename.doc_type, filename.confidence * ONE_SIDED_PENALTY),
        (false, true) => (content.doc_type, content.confidence * ONE_SIDED_PENALTY),
        (true, true) if filename.doc_type == content.doc_type => (
            filename.doc_type,
            ((filename.confidence + content.confidence) / 2.0).min(FILENAME_CONFIDENCE_CAP),
        ),
        (true, true) => {
            let winner = if filename.confidence > content.confidence {
                filename.doc_type
            } else {
                content.doc_type
            };
            let weakest = filename.confidence.min(content.confidence);
            debug!(
                filename_type = %filename.doc_type,
                content_type = %content.doc_type,
                winner = %winner,
                "filename and content disagree on document type"
            );
            (winner, weakest * CONFLICT_PENALTY)
        }
    };

    DocumentClassification {
        doc_type,
        confidence,
        filename_guess: Some(filename),
        content_guess: Some(content),
        completion_guess: None,
    }
}

/// Classify a document from its optional filename and its text.
pub fn classify_document(
    filename: Option<&str>,
    content: &str,
    scan_chars: usize,
) -> DocumentClassification {
    let filename_guess = filename
        .map(classify_filename)
        .unwrap_or_else(TypeGuess::undetermined);
    let content_guess = classify_content(content, scan_chars);
    reconcile(filename_guess, content_guess)
}
