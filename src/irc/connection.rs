use crate::config::{NetworkConfig, ServerAddress};
use irc::client::prelude::*;
use irc::client::ClientStream;

/// A registered-or-registering IRC connection: the outbound sender and the
/// stream of inbound protocol events.
pub struct IrcConnection {
    pub sender: Sender,
    pub stream: ClientStream,
}

/// Identity used when registering with a server.
pub struct Registration<'a> {
    pub nickname: String,
    pub alt_nicks: Vec<String>,
    pub username: &'a str,
    pub realname: &'a str,
}

/// Connect to one network and send the registration commands. Joining the
/// channel is left to the caller, once the server has welcomed us.
pub async fn connect(
    network: &NetworkConfig,
    address: &ServerAddress,
    registration: Registration<'_>,
) -> irc::error::Result<IrcConnection> {
    let config = Config {
        server: Some(address.host.clone()),
        port: Some(address.port),
        use_tls: Some(address.tls),
        nickname: Some(registration.nickname),
        alt_nicks: registration.alt_nicks,
        username: Some(registration.username.to_string()),
        realname: Some(registration.realname.to_string()),
        password: network.password.clone(),
        dangerously_accept_invalid_certs: Some(network.accept_invalid_certs),
        ..Config::default()
    };

    let mut client = Client::from_config(config).await?;
    client.identify()?;

    let sender = client.sender();
    let stream = client.stream()?;

    Ok(IrcConnection { sender, stream })
}
