use link_feed::config::Config;
use link_feed::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = std::env::args().collect::<Vec<_>>();

    match &args[..] {
        [_, db, name, password] => {
            let db = database::Db::new(db)?;
            let password_enc = crypto::encode_password(password.as_bytes())?;

            let user = db.insert_user(name, &password_enc).await?;
            let token = Config::from_env()?.issuer().issue(&user)?;

            println!("{}\t{}", user.id, token);
            Ok(())
        },
        _ => {
            eprintln!("usage: ./add_user db name password");
            std::process::exit(1);
        },
    }
}
