use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Backhaul exposes local HTTP services through a remote tunnel server", long_about = None)]
pub(crate) struct BackhaulCli {
    /// tunnel server address, i.e. 127.0.0.1:8000
    #[arg(short, long)]
    pub remote: Option<String>,
    /// upstream routing spec, i.e. http://127.0.0.1:3000 or app.example.com=http://127.0.0.1:3000,other.example.com=http://127.0.0.1:3001
    #[arg(short, long)]
    pub upstream: Option<String>,
    /// authentication token
    #[arg(short, long)]
    pub token: Option<String>,
    /// read the authentication token from a file
    #[arg(short = 'f', long)]
    pub token_from: Option<String>,
    /// print the resolved token at startup
    #[arg(long)]
    pub print_token: Option<bool>,
    /// forward only to the upstream URLs present in the routing table
    #[arg(long)]
    pub strict_forwarding: Option<bool>,
    /// custom config file
    #[arg(short, long)]
    pub config: Option<String>,
}
