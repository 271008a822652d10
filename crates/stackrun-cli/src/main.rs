mod cli;

#[tokio::main]
async fn main() {
  // Loaded before parsing so `.env` can supply `STACKRUN_*` flags
  dotenv::dotenv().ok();

  let args = cli::Cli::parse_with_project_env(std::env::args_os());
  stackrun_logger::init_logger_with_level(args.log_level());

  let exit_code = match cli::run(args).await {
    Ok(exit_code) => exit_code,
    Err(err) => {
      log::error!("{:#}", err);
      cli::exit_code(&err)
    }
  };

  std::process::exit(exit_code);
}
