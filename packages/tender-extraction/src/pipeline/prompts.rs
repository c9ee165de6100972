//! Completion prompts for the extraction pipeline.
//!
//! Prompts are written in Turkish: the documents are Turkish and the
//! reply keys are the Turkish field names `RawExtraction` deserializes.

use crate::pipeline::disambiguate::DisambiguationResult;

/// System prompt shared by both completion calls.
pub const SYSTEM_PROMPT: &str = "Sen Türkiye kamu ihalelerinde uzman bir yemek hizmetleri analistisin. \
Yalnızca geçerli JSON döndür; JSON'dan önce veya sonra metin yazma.";

/// Prompt for proposing the provisional field set.
pub const EXTRACTION_PROMPT: &str = r#"Aşağıdaki ihale belgesinden yemek hizmeti bilgilerini çıkar.

Dosya: {filename}

## KİŞİ SAYISI KURALLARI
- kisi_sayisi: yemek verilecek kişi sayısıdır, personel sayısı değildir.
- "8 personel tarafından yapılacak" → personel; kisi_sayisi için kullanma.
- "1 aşçıbaşı, 3 aşçı, 2 garson" → kadro listesi; personel_sayisi olarak yaz.
- "500 kişiye yemek", "700 öğrenciye" → kisi_sayisi.
- Birden fazla kuruluş listelenmişse her kuruluştaki kişi sayısını topla.
- "260.000 öğün" gibi toplam öğün sayıları kişi sayısı değildir.
- Madde ve bent numaraları ("Madde 15", "17-Yüklenici") veri değildir.
{context_hints}
## JSON FORMATI
{
  "kurum": "string|null",
  "ihale_turu": "string|null",
  "kisi_sayisi": number|null,
  "personel_sayisi": number|null,
  "ogun_sayisi": number|null,
  "gun_sayisi": number|null,
  "tahmini_butce": number|null,
  "teslim_suresi": "string|null",
  "ihale_suresi": "string|null",
  "ihale_tarihi": "YYYY-MM-DD|null",
  "teklif_son_tarih": "YYYY-MM-DD|null",
  "belge_turu": "teknik_sartname|ihale_ilani|sozlesme_tasarisi|idari_sartname|fiyat_teklif_mektubu|diger|belirsiz",
  "belge_turu_guven": 0.0,
  "ornek_menu_basliklari": [],
  "ozel_sartlar": [],
  "riskler": [],
  "kanitlar": {"kisi_sayisi": "metinden kısa alıntı"},
  "guven_skoru": 0.0
}

## KURALLAR
1. Sayılar number tipinde olmalı ("1.500.000 TL" → 1500000).
2. Bulamazsan null yaz.
3. guven_skoru 0 ile 1 arasında olmalı ve her zaman yazılmalı.

## BELGE
{document}"#;

/// Prompt for the qualitative contextual analysis of a validated record.
pub const CONTEXTUAL_ANALYSIS_PROMPT: &str = r#"Aşağıdaki doğrulanmış ihale verilerini Türkiye kamu ihale piyasası koşullarında değerlendir.

# VERİLER
{record}

## JSON FORMATI
{
  "operasyonel_riskler": {
    "seviye": "dusuk|orta|yuksek",
    "faktorler": ["ölçülebilir risk faktörleri"],
    "oneriler": ["uygulanabilir öneriler"]
  },
  "maliyet_sapma_olasiligi": {
    "oran": 25,
    "sebepler": ["maliyet sapması nedenleri"],
    "onlem_oneriler": ["önlemler"]
  },
  "zaman_uygunlugu": {
    "durum": "yeterli|sinirda|yetersiz",
    "aciklama": "teslim süresi ve hazırlık değerlendirmesi"
  },
  "genel_oneri": "katılım kararını destekleyen stratejik özet"
}

Sayısal alanları değiştirme; yalnızca değerlendirme yap."#;

/// Describe the disambiguated numbers so the completion service does not
/// have to re-derive them.
pub fn format_context_hints(context: &DisambiguationResult) -> String {
    let join = |values: &[u32]| {
        values
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = Vec::new();
    if !context.recipient_numbers.is_empty() {
        lines.push(format!(
            "- Hizmet alan kişi sayısı olarak tespit edilen sayılar: {}",
            join(&context.recipient_numbers)
        ));
    }
    if !context.personnel_numbers.is_empty() {
        lines.push(format!(
            "- Personel sayısı olarak tespit edilen sayılar (kisi_sayisi DEĞİL): {}",
            join(&context.personnel_numbers)
        ));
    }
    if let Some(total) = context.facility_total() {
        let parts = context
            .facility_counts
            .iter()
            .map(|f| format!("{}: {}", f.name, f.count))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("- Kuruluş listesi ({parts}) toplamı: {total}"));
    }
    if let Some(total) = context.meal_plan.total_meals {
        lines.push(format!("- {total} bir toplam öğün sayısıdır, kişi sayısı değildir"));
    }

    if lines.is_empty() {
        return String::new();
    }
    format!("\n## METİN ANALİZİ\n{}\n", lines.join("\n"))
}

/// Format the extraction prompt for one document.
pub fn format_extraction_prompt(
    document: &str,
    filename: Option<&str>,
    context: &DisambiguationResult,
) -> String {
    EXTRACTION_PROMPT
        .replace("{filename}", filename.unwrap_or("belirtilmemiş"))
        .replace("{context_hints}", &format_context_hints(context))
        .replace("{document}", document)
}

/// Format the contextual analysis prompt for a serialized record.
pub fn format_contextual_analysis_prompt(record_json: &str) -> String {
    CONTEXTUAL_ANALYSIS_PROMPT.replace("{record}", record_json)
}
