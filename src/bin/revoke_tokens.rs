use link_feed::*;

#[tokio::main]
async fn main() -> Result<()> {
    let args = std::env::args().collect::<Vec<_>>();

    match &args[..] {
        [_, db, name] => {
            let db = database::Db::new(db)?;

            let user = db.get_user_by_name(name).await?;
            let user = db.revoke_tokens(user.id).await?;

            println!("{}\ttoken version {}", user.id, user.token_version);
            Ok(())
        },
        _ => {
            eprintln!("usage: ./revoke_tokens db name");
            std::process::exit(1);
        },
    }
}
