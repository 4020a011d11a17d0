use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "ImBridge 开发任务自动化")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建所有组件 (release)
    Build,
    /// 运行守护进程 (开发模式)
    Dev {
        /// 日志级别 (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },
    /// 运行测试
    Test {
        /// 同时运行需要 potrace 的测试
        #[arg(long)]
        with_tracer: bool,
    },
    /// 运行测试并生成覆盖率报告
    Coverage,
    /// 生成自签名 TLS 证书，手机端通过 HTTPS 访问
    GenCert {
        /// 输出目录 (默认: ~/.config/imbridge)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// 证书中的主机名或 IP
        #[arg(long, default_value = "imbridge.local")]
        host: String,
    },
    /// 清理构建产物
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // 确保在项目根目录执行
    let project_root = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf))
        .map_or_else(std::env::current_dir, Ok)?;
    sh.change_dir(&project_root);

    match cli.command {
        Commands::Build => build(&sh)?,
        Commands::Dev { log_level } => dev(&sh, &log_level)?,
        Commands::Test { with_tracer } => test(&sh, with_tracer)?,
        Commands::Coverage => coverage(&sh)?,
        Commands::GenCert { out_dir, host } => gen_cert(&sh, out_dir, &host)?,
        Commands::Clean => clean(&sh)?,
    }

    Ok(())
}

fn build(sh: &Shell) -> Result<()> {
    println!("🔨 构建所有组件...");
    cmd!(sh, "cargo build --release -p imbridge-daemon -p imbridge-cli").run()?;
    println!("✅ 构建完成");
    Ok(())
}

fn dev(sh: &Shell, log_level: &str) -> Result<()> {
    println!("🚀 启动开发模式守护进程...");
    let rust_log = format!("{level},imbridge_core={level}", level = log_level);
    let _env = sh.push_env("RUST_LOG", rust_log);
    cmd!(sh, "cargo run -p imbridge-daemon -- --static-dir static").run()?;
    Ok(())
}

fn test(sh: &Shell, with_tracer: bool) -> Result<()> {
    println!("🧪 运行测试...");
    cmd!(sh, "cargo test --workspace").run()?;
    if with_tracer {
        println!("🖋️  运行 potrace 相关测试...");
        cmd!(sh, "cargo test -p imbridge-core -- --ignored").run()?;
    }
    println!("✅ 测试完成");
    Ok(())
}

fn coverage(sh: &Shell) -> Result<()> {
    println!("📊 运行测试覆盖率分析...");

    // 检查 cargo-tarpaulin 是否安装
    if cmd!(sh, "cargo tarpaulin --version").run().is_err() {
        println!("📦 安装 cargo-tarpaulin...");
        cmd!(sh, "cargo install cargo-tarpaulin").run()?;
    }

    println!("🔍 分析中...");
    cmd!(
        sh,
        "cargo tarpaulin --packages imbridge-core --out Html --output-dir target/coverage"
    )
    .run()?;

    println!("✅ 覆盖率报告已生成");
    println!("   HTML 报告: target/coverage/tarpaulin-report.html");
    Ok(())
}

fn gen_cert(sh: &Shell, out_dir: Option<PathBuf>, host: &str) -> Result<()> {
    let out_dir = out_dir.unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imbridge")
    });
    sh.create_dir(&out_dir)?;
    let cert = out_dir.join("cert.pem");
    let key = out_dir.join("key.pem");
    let subject = format!("/CN={}", host);

    println!("🔐 生成自签名证书...");
    // -nodes 输出未加密的 PKCS#8 私钥
    cmd!(
        sh,
        "openssl req -x509 -newkey rsa:2048 -nodes -sha256 -days 825 -keyout {key} -out {cert} -subj {subject}"
    )
    .run()?;

    println!("✅ 证书已生成");
    println!("   证书: {}", cert.display());
    println!("   私钥: {}", key.display());
    println!("   手机首次访问时需要手动信任该证书");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 清理构建产物...");
    cmd!(sh, "cargo clean").run()?;
    println!("✅ 清理完成");
    Ok(())
}
