//! Document typing results.

use serde::{Deserialize, Serialize};

/// Category of a procurement document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Teknik şartname: menus, portions, hygiene rules.
    TechnicalSpecification,

    /// İhale ilanı: dates, guarantees, application procedure.
    TenderNotice,

    /// Sözleşme tasarısı: articles, obligations, termination.
    ContractDraft,

    /// İdari şartname: administrative rules and required documents.
    AdministrativeSpecification,

    /// Fiyat teklif mektubu: unit prices and offer totals.
    PriceQuoteLetter,

    /// Recognizable attachment that fits no other category.
    Other,

    /// Not enough signal to decide.
    #[default]
    Undetermined,
}

impl DocumentType {
    /// Every category, in tie-break order.
    pub const ALL: [DocumentType; 7] = [
        DocumentType::TechnicalSpecification,
        DocumentType::TenderNotice,
        DocumentType::AdministrativeSpecification,
        DocumentType::ContractDraft,
        DocumentType::PriceQuoteLetter,
        DocumentType::Other,
        DocumentType::Undetermined,
    ];

    /// Short code used by the completion service (`teknik_sartname`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::TechnicalSpecification => "teknik_sartname",
            DocumentType::TenderNotice => "ihale_ilani",
            DocumentType::ContractDraft => "sozlesme_tasarisi",
            DocumentType::AdministrativeSpecification => "idari_sartname",
            DocumentType::PriceQuoteLetter => "fiyat_teklif_mektubu",
            DocumentType::Other => "diger",
            DocumentType::Undetermined => "belirsiz",
        }
    }

    /// Parse a completion-service code, falling back to `Undetermined`.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .unwrap_or(DocumentType::Undetermined)
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, DocumentType::Undetermined)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One scorer's verdict, with the keywords that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeGuess {
    pub doc_type: DocumentType,
    pub confidence: f64,

    /// Keywords that matched, for explainability.
    #[serde(default)]
    pub matched: Vec<String>,
}

impl TypeGuess {
    pub fn undetermined() -> Self {
        Self {
            doc_type: DocumentType::Undetermined,
            confidence: 0.0,
            matched: vec![],
        }
    }
}

/// Reconciled classification of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentClassification {
    pub doc_type: DocumentType,
    pub confidence: f64,
    pub filename_guess: Option<TypeGuess>,
    pub content_guess: Option<TypeGuess>,

    /// Type proposed in the completion reply (`belge_turu`), kept so the
    /// record can be reclassified under another filename without a new call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_guess: Option<TypeGuess>,
}

impl Default for DocumentClassification {
    fn default() -> Self {
        Self {
            doc_type: DocumentType::Undetermined,
            confidence: 0.0,
            filename_guess: None,
            content_guess: None,
            completion_guess: None,
        }
    }
}
