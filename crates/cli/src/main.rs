use clap::Parser;
use golden_bell_core::briefing::BriefingService;
use golden_bell_core::quote::InstrumentSymbol;
use golden_bell_core::report::{Category, ReportRequest, MAX_SYMBOLS};
use golden_bell_core::time::kr_market::MarketClock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "golden_bell_cli")]
struct Args {
    /// News category: slug (political, corporate-disclosure, global-macro,
    /// momentum-theme, all) or its Korean label.
    #[arg(long, default_value = "political")]
    category: Category,

    /// Instrument to quote into the prompt. Repeatable; six digits = KRX code.
    #[arg(long = "symbol")]
    symbols: Vec<InstrumentSymbol>,

    /// Print the available categories and exit.
    #[arg(long)]
    list_categories: bool,

    /// Print the composed prompt instead of calling the model.
    #[arg(long)]
    show_prompt: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = golden_bell_core::config::Settings::from_env()?;
    let sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if args.list_categories {
        for category in Category::ALL {
            println!("{:<22} {}", category.slug(), category.label());
        }
        return Ok(());
    }

    anyhow::ensure!(
        args.symbols.len() <= MAX_SYMBOLS,
        "at most {MAX_SYMBOLS} --symbol values are allowed"
    );

    let service = BriefingService::from_settings(&settings)?;
    let request = ReportRequest::new(args.category).with_symbols(args.symbols);

    if args.show_prompt {
        let clock = MarketClock::now()?;
        println!("{}", service.generator().compose_prompt(&request, &clock).await);
        return Ok(());
    }

    tracing::info!(
        category = request.category.slug(),
        symbols = request.symbols.len(),
        "running briefing"
    );

    match service.run(&request).await {
        Ok(report) => {
            tracing::info!(model = %report.model, "briefing complete");
            println!("{}", report.text);
            println!();
            println!("참고: 이 정보는 참고용입니다. 실제 매매 전 증권사 앱에서 반드시 다시 확인하세요!");
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, "briefing failed");
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
            eprintln!("{}", err.user_message());
            // Flush pending events; exit() skips destructors.
            drop(sentry_guard);
            std::process::exit(1);
        }
    }
}

fn init_sentry(settings: &golden_bell_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_category_and_repeated_symbols() {
        let args = Args::try_parse_from([
            "golden_bell_cli",
            "--category",
            "all",
            "--symbol",
            "005930",
            "--symbol",
            "AAPL",
        ])
        .unwrap();
        assert_eq!(args.category, Category::AllCombined);
        assert_eq!(args.symbols.len(), 2);
        assert!(args.symbols[0].is_domestic());
    }

    #[test]
    fn accepts_korean_label() {
        let args = Args::try_parse_from(["golden_bell_cli", "--category", "테마급등"]).unwrap();
        assert_eq!(args.category, Category::MomentumTheme);
    }

    #[test]
    fn rejects_malformed_symbol() {
        assert!(Args::try_parse_from(["golden_bell_cli", "--symbol", "A B"]).is_err());
    }
}
