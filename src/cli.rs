//! Console front ends: the scripted demo and the interactive shell.
//!
//! Both drive a [`Blockchain`] and a [`WalletRegistry`] built from a
//! [`Config`]. Rendering helpers return `comfy_table` tables so callers decide
//! where they are printed.

use crate::amount::Amount;
use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::transaction::Transaction;
use crate::wallet::{Wallet, WalletRegistry};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::io::{self, BufRead, Write};

/// Wallets every demo and shell session starts with.
pub const DEFAULT_WALLETS: [&str; 3] = ["alice", "bob", "miner"];

const HELP: &str = "\
Commands:
  help                                 show this help
  show_chain                           print every block
  create_wallet <name>                 generate a new wallet
  show_wallets                         list wallets with balances
  export_priv <name>                   print a wallet's private key hex
  import_priv <name> <hex>             register a wallet from a private key
  faucet <to> <amount>                 queue a SYSTEM grant
  tx <from> <to> <amount> [fee]        sign and queue a transfer
  mine <miner>                         mine pending transactions
  balance <name_or_pubhex>             confirmed balance
  pending                              list pending transactions
  validate                             verify the whole chain
  exit                                 leave the shell";

fn header_cell(title: &str) -> Cell {
    Cell::new(title)
        .fg(TableColor::Cyan)
        .add_attribute(Attribute::Bold)
}

fn short_hex(hex: &str) -> String {
    if hex.len() > 20 {
        format!("{}...{}", &hex[..10], &hex[hex.len() - 6..])
    } else {
        hex.to_string()
    }
}

fn format_timestamp(millis: u64) -> String {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn chain_table(blocks: &[Block]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            header_cell("Index"),
            header_cell("Time"),
            header_cell("Txs"),
            header_cell("Nonce"),
            header_cell("Previous"),
            header_cell("Hash"),
        ]);

    for block in blocks {
        table.add_row(vec![
            Cell::new(format!("#{}", block.index())).fg(TableColor::White),
            Cell::new(format_timestamp(block.header.timestamp)).fg(TableColor::Grey),
            Cell::new(block.transactions.len()).fg(TableColor::White),
            Cell::new(block.header.nonce).fg(TableColor::White),
            Cell::new(short_hex(&block.previous_hash_str())).fg(TableColor::Grey),
            Cell::new(short_hex(&block.hash_str())).fg(TableColor::Green),
        ]);
    }
    table
}

pub fn wallet_table(wallets: &[Wallet], chain: &Blockchain) -> Table {
    let balances = chain.balances();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            header_cell("Label"),
            header_cell("Public key"),
            header_cell("Balance"),
        ]);

    for wallet in wallets {
        let balance = balances
            .get(&wallet.public_key())
            .copied()
            .unwrap_or(Amount::ZERO);
        table.add_row(vec![
            Cell::new(&wallet.label).fg(TableColor::Yellow),
            Cell::new(wallet.public_key_hex()).fg(TableColor::White),
            Cell::new(balance).fg(TableColor::Green),
        ]);
    }
    table
}

fn print_balances(chain: &Blockchain, wallets: &WalletRegistry) {
    for wallet in wallets.list() {
        println!(
            "  {:<8} {}",
            wallet.label.bright_white(),
            chain.get_balance(&wallet.public_key()).to_string().green()
        );
    }
}

/// Runs the scripted walkthrough: faucet to alice, mine, alice pays bob,
/// an overspend is refused, mine again. Returns the resulting ledger and
/// wallets.
pub fn run_demo(config: &Config) -> Result<(Blockchain, WalletRegistry), ChainError> {
    let mut chain = Blockchain::from_config(config);
    let wallets = WalletRegistry::with_wallets(DEFAULT_WALLETS)?;
    let alice = wallets.get("alice")?;
    let bob = wallets.get("bob")?;
    let miner = wallets.get("miner")?;

    println!("{}", "powledger demo".bright_cyan().bold());
    println!(
        "{}",
        format!(
            "difficulty {} | reward {}",
            chain.difficulty(),
            chain.mining_reward()
        )
        .cyan()
    );
    println!();

    println!("{}", "Faucet: 100 to alice".bright_blue());
    chain.submit(Transaction::issuance(
        alice.public_key(),
        Amount::from_coins(100),
    ))?;
    let block = chain.mine_pending_transactions(&miner.public_key());
    println!("{}", format!("Mined block #{} {}", block.index(), block.hash_str()).green());
    print_balances(&chain, &wallets);
    println!();

    println!("{}", "alice -> bob: 30 (fee 0.5)".bright_blue());
    let mut tx = Transaction::new(
        alice.public_key(),
        bob.public_key(),
        Amount::from_coins(30),
        Amount::from_units(50_000_000),
    );
    tx.sign(&alice.keypair)?;
    chain.submit(tx)?;

    println!("{}", "alice -> bob: 1000 (should be refused)".bright_blue());
    let mut overspend = Transaction::new(
        alice.public_key(),
        bob.public_key(),
        Amount::from_coins(1000),
        Amount::ZERO,
    );
    overspend.sign(&alice.keypair)?;
    match chain.submit(overspend) {
        Ok(id) => println!("{}", format!("Unexpectedly accepted {}", id).red()),
        Err(e) => println!("{}", format!("Rejected: {}", e).yellow()),
    }

    let block = chain.mine_pending_transactions(&miner.public_key());
    println!("{}", format!("Mined block #{} {}", block.index(), block.hash_str()).green());
    print_balances(&chain, &wallets);
    println!();

    let valid = chain.is_chain_valid();
    println!(
        "Chain valid: {}",
        if valid { "yes".green() } else { "no".red() }
    );
    println!("{}", chain_table(chain.blocks()));

    Ok((chain, wallets))
}

/// What the shell should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    Continue(String),
    Exit,
}

pub struct Shell {
    chain: Blockchain,
    wallets: WalletRegistry,
}

impl Shell {
    pub fn new(config: &Config) -> Result<Self, ChainError> {
        Ok(Shell {
            chain: Blockchain::from_config(config),
            wallets: WalletRegistry::with_wallets(DEFAULT_WALLETS)?,
        })
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn wallets(&self) -> &WalletRegistry {
        &self.wallets
    }

    /// Executes one command line. Ledger and wallet errors are returned to
    /// the caller; malformed input produces a usage message instead.
    pub fn execute(&mut self, line: &str) -> Result<ShellOutcome, ChainError> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((command, args)) = args.split_first() else {
            return Ok(ShellOutcome::Continue(String::new()));
        };

        let output = match (*command, args) {
            ("help", _) => HELP.to_string(),
            ("exit" | "quit", _) => return Ok(ShellOutcome::Exit),
            ("show_chain", _) => chain_table(self.chain.blocks()).to_string(),
            ("create_wallet", [name]) => {
                let wallet = self.wallets.create(name)?;
                format!("Created wallet {} {}", wallet.label, wallet.public_key_hex())
            }
            ("show_wallets", _) => wallet_table(&self.wallets.list(), &self.chain).to_string(),
            ("export_priv", [name]) => self.wallets.get(name)?.export_secret_hex(),
            ("import_priv", [name, secret]) => {
                let wallet = self
                    .wallets
                    .insert(name, KeyPair::from_secret_hex(secret)?)?;
                format!("Imported wallet {} {}", wallet.label, wallet.public_key_hex())
            }
            ("faucet", [to, amount]) => {
                let recipient = self.wallets.resolve(to)?;
                let amount: Amount = amount.parse()?;
                let id = self
                    .chain
                    .submit(Transaction::issuance(recipient, amount))?;
                format!("Faucet transaction queued {}", id)
            }
            ("tx", [from, to, amount, rest @ ..]) if rest.len() <= 1 => {
                let sender = self.wallets.get(from)?;
                let recipient = self.wallets.resolve(to)?;
                let amount: Amount = amount.parse()?;
                let fee = match rest.first() {
                    Some(fee) => fee.parse()?,
                    None => Amount::ZERO,
                };
                let mut tx = Transaction::new(sender.public_key(), recipient, amount, fee);
                tx.sign(&sender.keypair)?;
                let id = self.chain.submit(tx)?;
                format!("Transaction queued {}", id)
            }
            ("mine", [miner]) => {
                let miner = self.wallets.resolve(miner)?;
                let block = self.chain.mine_pending_transactions(&miner);
                format!(
                    "Mined block #{} with {} transactions, hash {}",
                    block.index(),
                    block.transactions.len(),
                    block.hash_str()
                )
            }
            ("balance", [who]) => {
                let key = self.wallets.resolve(who)?;
                self.chain.get_balance(&key).to_string()
            }
            ("pending", _) => {
                let pending = self.chain.pending();
                if pending.is_empty() {
                    "No pending transactions".to_string()
                } else {
                    pending
                        .iter()
                        .map(|entry| {
                            let tx = &entry.transaction;
                            format!(
                                "{} {} -> {} amount {} fee {}",
                                entry.id,
                                short_hex(&tx.sender.to_string()),
                                short_hex(&tx.recipient.to_string()),
                                tx.amount,
                                tx.fee
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            ("validate", _) => match self.chain.validate_chain() {
                Ok(()) => "Chain is valid".to_string(),
                Err(e) => format!("Chain is INVALID: {}", e),
            },
            (
                "create_wallet" | "export_priv" | "import_priv" | "faucet" | "tx" | "mine"
                | "balance",
                _,
            ) => format!("Wrong arguments for '{}'. Type 'help' for usage.", command),
            (other, _) => format!("Unknown command '{}'. Type 'help' for usage.", other),
        };

        Ok(ShellOutcome::Continue(output))
    }
}

/// Interactive read-eval-print loop on stdin.
pub fn run_shell(config: &Config) -> Result<(), ChainError> {
    let mut shell = Shell::new(config)?;
    println!("{}", "powledger shell".bright_cyan().bold());
    println!(
        "{}",
        "Wallets alice, bob and miner are ready. Type 'help' for commands.".cyan()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", ">".bright_magenta());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        match shell.execute(&line?) {
            Ok(ShellOutcome::Exit) => break,
            Ok(ShellOutcome::Continue(output)) => {
                if !output.is_empty() {
                    println!("{}", output);
                }
            }
            Err(e) => println!("{}", format!("Error: {}", e).red()),
        }
    }
    Ok(())
}
