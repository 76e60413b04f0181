use chrono::Utc;
use clap::Parser;
use libhub::core::fine::{self, format_currency, parse_timestamp};
use libhub::core::loans::split_loans;
use libhub::core::report::OverdueReport;
use libhub::core::SessionStore;
use libhub::utils::error::ErrorSeverity;
use libhub::utils::{logger, validation::Validate};
use libhub::{
    BackendClient, CliConfig, Command, FileSessionStore, FlowUpdate, PortalConfig, PortalError,
    Result, SignupForm, VerificationFlow, VerificationPurpose, VerificationState,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::debug!("CLI config: {:?}", cli.command);

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: CliConfig) -> Result<()> {
    let config = cli.resolve()?;
    config.validate()?;

    let client = BackendClient::from_config(&config);
    let store = FileSessionStore::new(config.session_path.clone());

    match cli.command {
        Command::Login { username, password } => {
            let session = client.login(&username, &password).await?;
            store.save(&session).await?;
            println!("✅ Logged in as {}", username);
        }
        Command::Signup {
            username,
            name,
            email,
            password,
            avatar,
            code,
        } => {
            let form = SignupForm {
                username,
                name,
                email,
                password,
                avatar,
            };
            let session = client.signup(&form).await?;
            store.save(&session).await?;
            println!("📨 Account created. Check your email for the activation code.");
            verify(&client, &store, VerificationPurpose::AccountActivation, code).await?;
            println!("✅ Account activated. You can now log in.");
        }
        Command::Logout => {
            store.clear().await?;
            println!("👋 Logged out");
        }
        Command::ForgotPassword { username, code } => {
            client.request_reset_code(&username).await?;
            println!("📨 Verification code sent successfully!");
            verify(&client, &store, VerificationPurpose::PasswordReset, code).await?;
            println!("🔐 Code accepted. You can now set a new password.");
        }
        Command::Verify { reset, code } => {
            let purpose = if reset {
                VerificationPurpose::PasswordReset
            } else {
                VerificationPurpose::AccountActivation
            };
            verify(&client, &store, purpose, code).await?;
            println!("✅ Verified");
        }
        Command::Fine { due, now, .. } => {
            let due = parse_timestamp(&due)?;
            let now = match now {
                Some(raw) => parse_timestamp(&raw)?,
                None => Utc::now(),
            };
            let days = fine::days_overdue(due, now);
            let amount = fine::compute_fine(due, now, config.daily_rate);
            println!("Overdue:      {}", if fine::is_overdue(due, now) { "yes" } else { "no" });
            println!("Days overdue: {}", days);
            println!("Fine:         {}", format_currency(amount));
        }
        Command::MyBooks => show_my_books(&client, &store, &config).await?,
        Command::Return { book_id } => {
            let session = store.load().await?;
            let loans = client.fetch_loans(&session).await?;
            let loan = loans
                .iter()
                .find(|l| !l.returned && (l.book_id == book_id || l.id == book_id))
                .ok_or_else(|| PortalError::InvalidState {
                    message: format!("no current loan for book {}", book_id),
                })?;
            client
                .return_book(&session, loan, Utc::now(), config.daily_rate)
                .await?;
            println!("✅ You have successfully returned \"{}\"", loan.title);
        }
        Command::OverdueReport { output } => {
            let session = store.load().await?;
            let users = client.fetch_overdue_users(&session).await?;
            let report = OverdueReport::from_users(&users, Utc::now(), config.daily_rate);
            tracing::info!(
                "📊 {} overdue books, {} outstanding",
                report.total_books(),
                format_currency(report.total_fine())
            );
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    report.write_csv(file)?;
                    println!("📁 Report saved to: {}", path);
                }
                None => report.write_csv(std::io::stdout().lock())?,
            }
        }
    }

    Ok(())
}

/// 驅動驗證碼輸入流程。
///
/// 給了 `--code` 就當作貼上；否則逐行讀 stdin：整行 4 位數字視為貼上，
/// 其他字元逐一當按鍵輸入到目前焦點格，`-` 代表倒退鍵。
async fn verify(
    client: &BackendClient,
    store: &FileSessionStore,
    purpose: VerificationPurpose,
    code: Option<String>,
) -> Result<()> {
    let mut session = store.load().await?;
    let mut flow = VerificationFlow::new(purpose);

    if let Some(code) = code {
        if !flow.paste(0, &code) {
            feed_keys(&mut flow, &code);
        }
        return match flow.submit(client, &mut session).await? {
            FlowUpdate::Verified => store.save(&session).await,
            FlowUpdate::Failed(message) => Err(PortalError::VerificationRejected { message }),
            FlowUpdate::Discarded => Err(PortalError::InvalidState {
                message: "verification response was discarded".to_string(),
            }),
        };
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Enter the 4-digit verification code:");

    while let Some(line) = lines.next_line().await? {
        if !flow.paste(0, &line) {
            feed_keys(&mut flow, line.trim());
        }
        eprintln!("  [{}]", flow.entry().render());

        if flow.state() != VerificationState::Ready {
            continue;
        }

        match flow.submit(client, &mut session).await? {
            FlowUpdate::Verified => {
                store.save(&session).await?;
                return Ok(());
            }
            FlowUpdate::Failed(message) => {
                eprintln!("❌ {}", message);
                eprintln!("Edit the code (use '-' for backspace) or press enter to resubmit:");
            }
            FlowUpdate::Discarded => break,
        }
    }

    flow.unmount();
    Err(PortalError::InvalidState {
        message: "verification was not completed".to_string(),
    })
}

fn feed_keys(flow: &mut VerificationFlow, keys: &str) {
    for key in keys.chars() {
        let focus = flow.entry().focus();
        if key == '-' {
            flow.backspace(focus);
        } else {
            flow.type_input(focus, key.encode_utf8(&mut [0; 4]));
        }
    }
}

async fn show_my_books(
    client: &BackendClient,
    store: &FileSessionStore,
    config: &PortalConfig,
) -> Result<()> {
    let session = store.load().await?;
    let loans = client.fetch_loans(&session).await?;
    let now = Utc::now();
    let (current, returned) = split_loans(loans);

    println!("Current loans ({})", current.len());
    if current.is_empty() {
        println!("  You have no borrowed books.");
    }
    for loan in &current {
        let fine = loan.outstanding_fine(now, config.daily_rate);
        let mut actions = Vec::new();
        if loan.can_return(now, config.daily_rate) {
            actions.push("return");
        }
        if loan.can_pay_fine(now, config.daily_rate) {
            actions.push("pay fine");
        }
        println!(
            "  {:<32} due {}  {:<8} fine {}{}  [{}]",
            loan.title,
            loan.due_date.format("%B %-d, %Y"),
            loan.status(now).to_string(),
            format_currency(fine),
            if loan.fine_paid { " (Paid)" } else { "" },
            actions.join(", ")
        );
    }

    println!("Return history ({})", returned.len());
    if returned.is_empty() {
        println!("  No return history yet.");
    }
    for loan in &returned {
        let returned_on = loan
            .return_date
            .map(|d| d.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<32} returned {}", loan.title, returned_on);
    }

    Ok(())
}
