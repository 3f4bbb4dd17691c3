use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Political,
    CorporateDisclosure,
    GlobalMacro,
    MomentumTheme,
    AllCombined,
}

struct CategoryRow {
    category: Category,
    slug: &'static str,
    label: &'static str,
    conditions: &'static str,
}

// Adding a category means adding a row here and a variant above.
static TABLE: [CategoryRow; 5] = [
    CategoryRow {
        category: Category::Political,
        slug: "political",
        label: "정치테마",
        conditions: "대통령/장관/국회의원 발언, 정책 발표, 외교 이슈",
    },
    CategoryRow {
        category: Category::CorporateDisclosure,
        slug: "corporate-disclosure",
        label: "기업공시",
        conditions: "실적발표, 대규모 계약, M&A, 유상증자, 자사주 매입",
    },
    CategoryRow {
        category: Category::GlobalMacro,
        slug: "global-macro",
        label: "글로벌이슈",
        conditions: "미국 증시, 중국 정책, 환율, 원자재, 지정학 리스크",
    },
    CategoryRow {
        category: Category::MomentumTheme,
        slug: "momentum-theme",
        label: "테마급등",
        conditions: "SNS/커뮤니티 화제, 급등 테마, 거래량 급증",
    },
    CategoryRow {
        category: Category::AllCombined,
        slug: "all",
        label: "전체 카테고리",
        conditions: "정치테마, 기업공시, 글로벌이슈, 테마급등 전체",
    },
];

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Political,
        Category::CorporateDisclosure,
        Category::GlobalMacro,
        Category::MomentumTheme,
        Category::AllCombined,
    ];

    /// The single categories an `AllCombined` report covers, in display order.
    pub const SINGLES: [Category; 4] = [
        Category::Political,
        Category::CorporateDisclosure,
        Category::GlobalMacro,
        Category::MomentumTheme,
    ];

    fn row(self) -> &'static CategoryRow {
        // TABLE holds one row per variant in declaration order.
        &TABLE[self as usize]
    }

    pub fn slug(self) -> &'static str {
        self.row().slug
    }

    pub fn label(self) -> &'static str {
        self.row().label
    }

    pub fn conditions(self) -> &'static str {
        self.row().conditions
    }

    pub fn is_combined(self) -> bool {
        self == Category::AllCombined
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    /// Accepts the UI label or the slug (slugs case-insensitively).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TABLE
            .iter()
            .find(|row| row.label == s || row.slug.eq_ignore_ascii_case(s))
            .map(|row| row.category)
            .ok_or_else(|| anyhow::anyhow!("unknown category: {s}"))
    }
}

impl TryFrom<String> for Category {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.slug().to_string()
    }
}
