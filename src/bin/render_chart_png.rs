use chart_snapshot::{
    ChartOptions, ChartService, ChartServiceConfig, DEFAULT_EXPORT_TIMEOUT, ProviderBinding,
    RenderCompletion, SurfaceProvider,
};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
struct CliArgs {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RenderRequest {
    width: u32,
    height: u32,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    font: Option<String>,
    #[serde(default)]
    options: Value,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let _ = chart_snapshot::telemetry::init_default_tracing();

    let args = parse_args()?;
    let raw = fs::read_to_string(&args.input)
        .map_err(|err| format!("failed to read request `{}`: {err}", args.input.display()))?;
    let request: RenderRequest = serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse request `{}`: {err}", args.input.display()))?;

    let config = ChartServiceConfig {
        font: request.font.clone(),
    };
    let options = match &request.options {
        Value::Null => ChartOptions::new(),
        other => ChartOptions::from_value(other.clone()).map_err(|err| err.to_string())?,
    };
    let timeout = request
        .timeout_ms
        .map_or(DEFAULT_EXPORT_TIMEOUT, Duration::from_millis);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;

    let (png, completion) = runtime.block_on(async {
        #[cfg(feature = "cairo-backend")]
        let binding = ProviderBinding::injected(chart_snapshot::provider::CairoSurfaceProvider::new());
        #[cfg(not(feature = "cairo-backend"))]
        let binding = ProviderBinding::injected(chart_snapshot::RasterSurfaceProvider::new());
        render(config, binding, &request, &options, timeout).await
    })?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!("failed to create output dir `{}`: {err}", parent.display())
            })?;
        }
    }
    fs::write(&args.output, &png)
        .map_err(|err| format!("failed to write `{}`: {err}", args.output.display()))?;

    let note = match completion {
        Some(RenderCompletion::TimedOut) => " (timed out before render finished)",
        _ => "",
    };
    println!(
        "wrote {}x{} chart ({} bytes) to {}{note}",
        request.width,
        request.height,
        png.len(),
        args.output.display()
    );
    Ok(())
}

async fn render<P: SurfaceProvider>(
    config: ChartServiceConfig,
    binding: ProviderBinding<P>,
    request: &RenderRequest,
    options: &ChartOptions,
    timeout: Duration,
) -> Result<(Vec<u8>, Option<RenderCompletion>), String> {
    let service = ChartService::start(config, binding).map_err(|err| err.to_string())?;
    let mut session = service
        .create_chart(request.width, request.height, options)
        .map_err(|err| err.to_string())?;
    let element = session
        .export(timeout)
        .await
        .map_err(|err| err.to_string())?;
    let completion = session.last_completion();
    service.stop();
    Ok((element.data().to_vec(), completion))
}

fn parse_args() -> Result<CliArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--input" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --input".to_owned())?;
                input = Some(PathBuf::from(value));
            }
            "--output" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --output".to_owned())?;
                output = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => {
                return Err(format!("unknown argument `{arg}`\n\n{}", usage_message()));
            }
        }
    }

    Ok(CliArgs {
        input: input.ok_or_else(|| format!("--input is required\n\n{}", usage_message()))?,
        output: output.ok_or_else(|| format!("--output is required\n\n{}", usage_message()))?,
    })
}

fn print_usage() {
    println!("{}", usage_message());
}

fn usage_message() -> String {
    "Usage: cargo run --bin render_chart_png -- --input <request.json> --output <chart.png>\n\nRequest JSON:\n  { \"width\": 400, \"height\": 300, \"timeout_ms\": 2000, \"font\": \"sans\", \"options\": { ... } }\n\nOptions:\n  --input <path>    Render request file\n  --output <path>   PNG destination\n  -h, --help        Show this message"
        .to_owned()
}
