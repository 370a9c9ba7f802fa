use crate::locale::Language;

#[derive(Debug)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
    pub prompts: [&'static str; 3],
}

static ENGLISH: [Category; 5] = [
    Category {
        id: "realistic",
        label: "Realistic",
        prompts: [
            "Cinematic shot of a beach at sunset with calm waves and golden reflections, 8k detail",
            "Professional portrait of a wise old man, dramatic lighting, fine facial detail",
            "Aerial view of a future New York, flying cars, neon lights, rainy atmosphere",
        ],
    },
    Category {
        id: "3d",
        label: "3D",
        prompts: [
            "Cute cartoon robot holding a flower, Pixar style, soft lighting, 4k",
            "Modern living room in 3D, soothing pastel colors, minimal furniture",
            "Low poly floating island in the sky with waterfalls and vivid colors",
        ],
    },
    Category {
        id: "fantasy",
        label: "Fantasy",
        prompts: [
            "Giant crystal palace above the clouds, dragons circling it, magical mood, digital painting",
            "Enchanted forest with glowing plants and strange creatures, purple and blue palette",
            "Legendary warrior in shining armor holding a sword of light, epic battle behind",
        ],
    },
    Category {
        id: "art",
        label: "Art",
        prompts: [
            "Oil painting of an old countryside village in the style of Van Gogh, visible brush strokes, warm colors",
            "Abstract composition of geometric shapes and overlapping watercolors, modern art",
            "Pencil drawing of a cat playing with a ball, realistic shading, white background",
        ],
    },
    Category {
        id: "islamic",
        label: "Islamic motif",
        prompts: [
            "Ancient mosque with intricate Islamic architecture at dawn, soft light, spiritual mood",
            "Intricate Islamic geometric patterns in gold and turquoise, high detail",
            "3D Arabic calligraphy of the word 'Salam' in the desert at sunset",
        ],
    },
];

static ARABIC: [Category; 5] = [
    Category {
        id: "realistic",
        label: "واقعي",
        prompts: [
            "صورة سينمائية لشاطئ وقت الغروب مع أمواج هادئة وانعكاسات ذهبية، دقة عالية 8k",
            "بورتري احترافي لرجل عجوز بملامح حكيمة، إضاءة درامية، تفاصيل دقيقة للوجه",
            "صورة جوية لمدينة نيويورك في المستقبل، سيارات طائرة، أضواء نيون، أجواء ممطرة",
        ],
    },
    Category {
        id: "3d",
        label: "ثلاثي الأبعاد",
        prompts: [
            "شخصية كرتونية لطيفة لروبوت صغير يحمل زهرة، نمط بيكسار، إضاءة ناعمة، دقة 4k",
            "غرفة معيشة عصرية بتصميم ثلاثي الأبعاد، ألوان باستيل مريحة، أثاث بسيط",
            "جزيرة عائمة في السماء بتصميم بولي منخفض (Low Poly)، شلالات مياه، ألوان زاهية",
        ],
    },
    Category {
        id: "fantasy",
        label: "خيالي",
        prompts: [
            "قصر كريستالي عملاق فوق السحاب، تنانين تحلق حوله، أجواء سحرية، رسم رقمي",
            "غابة مسحورة بنباتات مضيئة ومخلوقات غريبة، ألوان بنفسجية وزرقاء، نمط خيالي",
            "محارب أسطوري يرتدي درعاً لامعاً ويحمل سيفاً من الضوء، خلفية معركة ملحمية",
        ],
    },
    Category {
        id: "art",
        label: "فني",
        prompts: [
            "لوحة زيتية لقرية ريفية قديمة، أسلوب فان جوخ، ضربات فرشاة واضحة، ألوان دافئة",
            "تكوين تجريدي لأشكال هندسية وألوان مائية متداخلة، فن حديث، تفاصيل دقيقة",
            "رسم بقلم الرصاص لقطة تلعب بالكرة، تظليل واقعي، خلفية بيضاء",
        ],
    },
    Category {
        id: "islamic",
        label: "طابع إسلامي",
        prompts: [
            "مسجد قديم بتصميم معماري إسلامي دقيق وقت الفجر، إضاءة ناعمة، جو روحاني",
            "زخارف هندسية إسلامية معقدة باللون الذهبي والأزرق الفيروزي، دقة عالية",
            "خط عربي ثلاثي الأبعاد لكلمة 'سلام' في الصحراء، إضاءة غروب الشمس",
        ],
    },
];

pub fn categories(language: Language) -> &'static [Category] {
    match language {
        Language::En => &ENGLISH,
        Language::Ar => &ARABIC,
    }
}

/// Looks up a category by id, falling back to the first one.
pub fn category(language: Language, id: &str) -> &'static Category {
    let all = categories(language);
    all.iter().find(|c| c.id == id).unwrap_or(&all[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_line_up_across_languages() {
        let en: Vec<&str> = categories(Language::En).iter().map(|c| c.id).collect();
        let ar: Vec<&str> = categories(Language::Ar).iter().map(|c| c.id).collect();
        assert_eq!(en, ar);
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(category(Language::En, "fantasy").label, "Fantasy");
        assert_eq!(category(Language::En, "nope").id, "realistic");
    }
}
