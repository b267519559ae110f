use radserver_proto::{
    encrypt_user_password, verify_response_authenticator, Code, Dictionary, Packet,
};
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <username> <password> <secret> [server_addr]", args[0]);
        eprintln!("Example: {} admin admin123 testing123 127.0.0.1:1812", args[0]);
        std::process::exit(1);
    }

    let username = &args[1];
    let password = &args[2];
    let secret = args[3].as_bytes();
    let server_addr = args.get(4).map(|s| s.as_str()).unwrap_or("127.0.0.1:1812");

    println!("RADIUS Client Test");
    println!("==================");
    println!("Server: {}", server_addr);
    println!("Username: {}", username);
    println!();

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(server_addr)?;

    let dictionary = Arc::new(Dictionary::builtin());
    let mut packet = Packet::new(Code::AccessRequest, 1, secret, Arc::clone(&dictionary));
    packet.add_attr("User-Name", username.as_str())?;
    let encrypted_password = encrypt_user_password(password, secret, &packet.authenticator)?;
    packet.add_attr("User-Password", encrypted_password)?;
    packet.add_attr("NAS-IP-Address", Ipv4Addr::LOCALHOST)?;

    let request_data = packet.encode()?;
    println!("Sending Access-Request ({} bytes)...", request_data.len());
    socket.send(&request_data)?;

    let mut buffer = vec![0u8; Packet::MAX_PACKET_SIZE];
    socket.set_read_timeout(Some(std::time::Duration::from_secs(5)))?;

    let len = match socket.recv(&mut buffer) {
        Ok(len) => len,
        Err(e) => {
            eprintln!("\nNo response from server: {}", e);
            eprintln!("  Make sure the RADIUS server is running on {}", server_addr);
            return Err(e.into());
        }
    };
    println!("Received response ({} bytes)", len);

    if !verify_response_authenticator(&buffer[..len], &packet.authenticator, secret) {
        eprintln!("\nResponse authenticator mismatch (wrong shared secret?)");
        std::process::exit(1);
    }

    let response = Packet::parse(&buffer[..len], secret, dictionary)?;
    match response.code {
        Code::AccessAccept => println!("\nAuthentication SUCCESSFUL (Access-Accept)"),
        Code::AccessReject => println!("\nAuthentication FAILED (Access-Reject)"),
        Code::AccessChallenge => println!("\nAuthentication CHALLENGE (Access-Challenge)"),
        other => println!("\nUnexpected response: {}", other),
    }

    println!("\nResponse Details:");
    println!("  Identifier: {}", response.identifier);
    for attr in &response.attributes {
        let name = response
            .dictionary
            .name(attr.attr_type)
            .unwrap_or_else(|| format!("Attr-{}", attr.attr_type));
        println!("  {} = {}", name, attr.value);
    }

    Ok(())
}
