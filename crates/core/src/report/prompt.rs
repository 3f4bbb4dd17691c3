use crate::quote::{InstrumentSymbol, QuoteOutcome};
use crate::report::category::Category;
use crate::time::kr_market::MarketClock;

pub const MARKET: &str = "한국";
pub const NO_SUMMARY_RULE: &str =
    "절대 요약하지 말고, 각 뉴스 유형을 다른 유형과 섞지 말고 독립적으로 분석하세요.";
pub const RANKS: [&str; 3] = ["1순위", "2순위", "3순위"];

const EXAMPLE_BLOCK: &str = "\
[뉴스 유형] N순위
- 뉴스 헤드라인: (원문 기사 제목)
- 핵심 요약: (2~3문장)
- 수혜 종목: 종목명 (종목코드)
- 연결 고리: (뉴스가 해당 종목 주가에 영향을 주는 이유)
- 현재가: 00,000원 (+0.00%)
- 매매 전략: (진입 시점과 대응 방법)
- 목표가 / 손절가: 00,000원 / 00,000원";

/// Builds the RICE prompt (Role, Instruction, Context, Example) for one briefing.
pub fn compose(
    category: Category,
    clock: &MarketClock,
    quotes: &[(InstrumentSymbol, QuoteOutcome)],
) -> String {
    let mut instruction = instruction(category);
    if let Some(block) = quote_block(quotes) {
        instruction.push_str("\n\n");
        instruction.push_str(&block);
    }

    format!(
        "R (Role) - 당신은 10년 경력의 단기 트레이딩 전문가입니다.\n\n\
I (Instruction) - {instruction}\n\n\
C (Context) - 기준일: {date}. {urgency}\n\n\
E (Example) - 반드시 아래 출력 형식을 그대로 엄수하세요. 순위마다 아래 블록을 반복합니다.\n{example}",
        date = clock.korean_date(),
        urgency = clock.phase.urgency(),
        example = EXAMPLE_BLOCK,
    )
}

fn instruction(category: Category) -> String {
    let ranks = RANKS.join(", ");

    if !category.is_combined() {
        return format!(
            "분석 조건: 뉴스 유형({label}: {conditions}), 시장({MARKET}).\n\
최근 24시간 이내 최신 뉴스와 실시간 주가를 검색하여 분석하고, 수혜 종목을 {ranks}로 선정하세요.",
            label = category.label(),
            conditions = category.conditions(),
        );
    }

    let mut out = format!(
        "분석 조건: 뉴스 유형(전체 카테고리), 시장({MARKET}).\n\
최근 24시간 이내 최신 뉴스와 실시간 주가를 검색하여 아래 {count}개 뉴스 유형을 모두 분석하세요.\n\
{NO_SUMMARY_RULE}\n\
각 뉴스 유형마다 수혜 종목을 {ranks}로 각각 따로 선정하세요.",
        count = Category::SINGLES.len(),
    );
    for single in Category::SINGLES {
        out.push_str(&format!(
            "\n- {label}: {conditions} ({ranks})",
            label = single.label(),
            conditions = single.conditions(),
        ));
    }
    out
}

fn quote_block(quotes: &[(InstrumentSymbol, QuoteOutcome)]) -> Option<String> {
    let lines: Vec<String> = quotes
        .iter()
        .filter_map(|(symbol, outcome)| {
            outcome
                .quote()
                .map(|q| format!("- {symbol}: {}", q.formatted()))
        })
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(format!(
        "실시간 시세 참고 (조회 시점 기준, 분석에 반영하세요):\n{}",
        lines.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::Quote;
    use crate::time::kr_market::MarketPhase;
    use chrono::NaiveDate;

    fn clock() -> MarketClock {
        MarketClock {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            phase: MarketPhase::PreOpen,
        }
    }

    fn sym(s: &str) -> InstrumentSymbol {
        InstrumentSymbol::parse(s).unwrap()
    }

    #[test]
    fn follows_rice_template() {
        let prompt = compose(Category::Political, &clock(), &[]);
        let r = prompt.find("R (Role)").unwrap();
        let i = prompt.find("I (Instruction)").unwrap();
        let c = prompt.find("C (Context)").unwrap();
        let e = prompt.find("E (Example)").unwrap();
        assert!(r < i && i < c && c < e);
        assert!(prompt.contains("2026년 01월 05일"));
        assert!(prompt.contains(MarketPhase::PreOpen.urgency()));
        assert!(prompt.contains("목표가 / 손절가"));
    }

    #[test]
    fn single_category_embeds_its_conditions_only() {
        let prompt = compose(Category::CorporateDisclosure, &clock(), &[]);
        assert!(prompt.contains("기업공시: 실적발표, 대규모 계약"));
        assert!(!prompt.contains("정치테마"));
        assert!(!prompt.contains(NO_SUMMARY_RULE));
    }

    #[test]
    fn combined_category_lists_every_label_and_forbids_summary() {
        let prompt = compose(Category::AllCombined, &clock(), &[]);
        for single in Category::SINGLES {
            assert!(prompt.contains(single.label()), "missing {}", single.label());
        }
        assert!(prompt.contains("요약하지 말고"));
        for rank in RANKS {
            assert!(prompt.contains(rank));
        }
    }

    #[test]
    fn quote_lines_skip_unavailable_symbols() {
        let quotes = vec![
            (sym("005930"), QuoteOutcome::Unavailable),
            (
                sym("AAPL"),
                QuoteOutcome::Available(Quote {
                    symbol: sym("AAPL"),
                    last_price: 101.0,
                    previous_close: 100.0,
                    currency: Some("USD".to_string()),
                }),
            ),
        ];
        let prompt = compose(Category::GlobalMacro, &clock(), &quotes);
        assert!(prompt.contains("- AAPL: 101.00 USD (+1.00%)"));
        assert!(!prompt.contains("005930"));
    }

    #[test]
    fn no_quote_block_when_nothing_available() {
        let quotes = vec![(sym("005930"), QuoteOutcome::Unavailable)];
        let prompt = compose(Category::MomentumTheme, &clock(), &quotes);
        assert!(!prompt.contains("실시간 시세 참고"));
    }
}
