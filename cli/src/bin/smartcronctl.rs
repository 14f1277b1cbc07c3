use anyhow::bail;
use clap::Parser;

use cli::{CtlArgs, CtlCommand, format_epoch};
use jobs::config::JobLoader;
use jobs::model::JobSpec;
use sink::sqlite::SqliteSink;
use telemetry::probe::{Probe, SystemProbe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = CtlArgs::parse();
    args.relocate_for_unprivileged();

    match &args.command {
        CtlCommand::List => cmd_list(&args).await,
        CtlCommand::Show { job_name } => cmd_show(&args, job_name).await,
        CtlCommand::Status => cmd_status().await,
        CtlCommand::History {
            job_name,
            limit,
            verbose,
        } => cmd_history(&args, job_name, *limit, *verbose).await,
        CtlCommand::Enable { job_name } => cmd_set_enabled(&args, job_name, true),
        CtlCommand::Disable { job_name } => cmd_set_enabled(&args, job_name, false),
    }
}

async fn cmd_list(args: &CtlArgs) -> anyhow::Result<()> {
    let jobs = JobLoader::new(&args.config_dir).load_all();
    if jobs.is_empty() {
        println!("No jobs configured.");
        return Ok(());
    }

    let sink = SqliteSink::new(&args.db, None).await?;

    println!(
        "\n{:<30} {:<10} {:<10} {:<20}",
        "Job Name", "Enabled", "AI Aware", "Last Run"
    );
    println!("{}", "-".repeat(80));

    for job in &jobs {
        let last_run = match sink.job_history(job.name(), 1).await?.first() {
            Some(entry) => format_epoch(entry.start_time),
            None => "Never".to_string(),
        };

        println!(
            "{:<30} {:<10} {:<10} {:<20}",
            job.name(),
            yes_no(job.spec.enabled),
            yes_no(job.spec.ai_aware),
            last_run
        );
    }
    println!();

    Ok(())
}

async fn cmd_show(args: &CtlArgs, job_name: &str) -> anyhow::Result<()> {
    let loader = JobLoader::new(&args.config_dir);
    let spec = load_named_spec(&loader, job_name)?;

    println!("\nJob: {}", spec.job_name);
    println!("{}", "=".repeat(60));
    println!("Command: {}", spec.command);
    println!("Enabled: {}", yes_no(spec.enabled));
    println!("AI Aware: {}", yes_no(spec.ai_aware));
    println!("Retry on Fail: {}", yes_no(spec.retry_on_fail));
    if let Some(timeout) = spec.timeout_sec {
        println!("Timeout: {timeout}s");
    }

    if !spec.preferred_time.is_empty() {
        println!("Preferred Times: {}", spec.preferred_time.join(", "));
    }
    if let (Some(start), Some(end)) = (&spec.schedule_window_start, &spec.schedule_window_end) {
        println!("Schedule Window: {start} - {end}");
    }

    let constraints = spec.constraints();
    if !constraints.is_empty() {
        println!("\nConstraints:");
        if let Some(v) = constraints.max_cpu_percent {
            println!("  - max_cpu_percent: {v}");
        }
        if let Some(v) = constraints.max_memory_percent {
            println!("  - max_memory_percent: {v}");
        }
        if let Some(v) = constraints.min_battery_percent {
            println!("  - min_battery_percent: {v}");
        }
        if let Some(v) = constraints.min_disk_free_gb {
            println!("  - min_disk_free_gb: {v}");
        }
        if let Some(v) = constraints.min_idle_time_sec {
            println!("  - min_idle_time_sec: {v}");
        }
    }

    let sink = SqliteSink::new(&args.db, None).await?;
    if let Some(entry) = sink.job_history(job_name, 1).await?.first() {
        let status = if entry.success { "SUCCESS" } else { "FAILED" };
        println!("\nLast Run: {} ({status})", format_epoch(entry.start_time));
    }
    println!();

    Ok(())
}

async fn cmd_status() -> anyhow::Result<()> {
    let mut probe = SystemProbe::new();
    let metrics = probe.sample().await;

    println!("\nSystem Status");
    println!("{}", "=".repeat(60));

    let cpu = &metrics.cpu;
    println!("\nCPU:");
    println!(
        "  Load Average: {:.2}, {:.2}, {:.2}",
        cpu.load_1m, cpu.load_5m, cpu.load_15m
    );
    println!("  CPU Usage: {:.1}%", cpu.cpu_percent);

    let mem = &metrics.memory;
    println!("\nMemory:");
    println!("  Total: {:.0} MB", mem.total_mb);
    println!("  Used: {:.0} MB ({:.1}%)", mem.used_mb, mem.percent);
    println!("  Available: {:.0} MB", mem.available_mb);

    if let Some(battery) = &metrics.battery {
        println!("\nBattery:");
        println!("  Level: {:.1}%", battery.percent);
        println!(
            "  Status: {}",
            if battery.is_charging {
                "Charging"
            } else {
                "Not Charging"
            }
        );
        if let Some(seconds_left) = battery.seconds_left {
            println!(
                "  Time Left: {}h {}m",
                seconds_left / 3600,
                (seconds_left % 3600) / 60
            );
        }
    }

    let disk = &metrics.disk;
    println!("\nDisk (/):");
    println!("  Total: {:.1} GB", disk.total_gb);
    println!("  Used: {:.1} GB ({:.1}%)", disk.used_gb, disk.percent);
    println!("  Free: {:.1} GB", disk.free_gb);

    if let Some(idle) = metrics.idle_time_sec {
        println!("\nUser Idle Time: {} minutes", idle / 60);
    }
    println!();

    Ok(())
}

async fn cmd_history(
    args: &CtlArgs,
    job_name: &str,
    limit: u32,
    verbose: bool,
) -> anyhow::Result<()> {
    let sink = SqliteSink::new(&args.db, None).await?;

    let history = sink.job_history(job_name, limit).await?;
    if history.is_empty() {
        println!("No execution history found for job '{job_name}'.");
        return Ok(());
    }

    println!("\nExecution History for: {job_name}");
    println!("{}", "=".repeat(80));

    for entry in &history {
        let status = if entry.success { "SUCCESS" } else { "FAILED" };
        println!(
            "\n[{}] {status} (Exit Code: {}, Duration: {:.2}s)",
            format_epoch(entry.start_time),
            entry.exit_code,
            entry.execution_time
        );

        if verbose {
            if !entry.stdout.is_empty() {
                println!("  STDOUT: {}", truncate(&entry.stdout, 200));
            }
            if !entry.stderr.is_empty() {
                println!("  STDERR: {}", truncate(&entry.stderr, 200));
            }
        }
    }
    println!();

    let rate = sink.success_rate(job_name, limit).await?;
    let avg = sink.average_execution_time(job_name, limit).await?;
    println!("Success Rate (last {limit}): {:.1}%", rate * 100.0);
    println!("Average Execution Time: {avg:.2}s");
    println!();

    Ok(())
}

fn cmd_set_enabled(args: &CtlArgs, job_name: &str, enabled: bool) -> anyhow::Result<()> {
    let loader = JobLoader::new(&args.config_dir);
    let Some(path) = loader.find_job_file(job_name) else {
        bail!("job '{job_name}' not found");
    };

    let mut spec = loader.load_file(&path)?;
    spec.enabled = enabled;
    loader.save_spec(&spec, &path)?;

    println!(
        "Job '{job_name}' {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn load_named_spec(loader: &JobLoader, job_name: &str) -> anyhow::Result<JobSpec> {
    let Some(path) = loader.find_job_file(job_name) else {
        bail!("job '{job_name}' not found");
    };
    loader.load_file(&path)
}

fn yes_no(v: bool) -> &'static str {
    if v { "Yes" } else { "No" }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect::<String>().replace('\n', " ")
}
