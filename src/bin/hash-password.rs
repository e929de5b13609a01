use portfolio_builder::password::hash_password;
use std::env;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD>");
        std::process::exit(1);
    });

    match hash_password(&password) {
        Ok(hashed) => {
            println!("\nAlgorithm : argon2id");
            println!("Hash      : {}\n", hashed);
            println!("# Seed a user directly:");
            println!(
                "INSERT INTO users (email, username, full_name, password_hash) VALUES ('...', '...', '...', '{}');",
                hashed
            );
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
