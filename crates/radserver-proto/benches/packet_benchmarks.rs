use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use radserver_proto::auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator,
};
use radserver_proto::{Code, Dictionary, Packet};
use std::sync::Arc;

const SECRET: &[u8] = b"testing123";

fn create_test_packet(dict: &Arc<Dictionary>, num_attributes: usize) -> Packet {
    let mut packet = Packet::new(Code::AccessRequest, 1, SECRET, Arc::clone(dict));

    packet
        .add_attr("User-Name", "testuser")
        .expect("Failed to create User-Name attribute");

    let encrypted_pwd = encrypt_user_password("testpassword", SECRET, &packet.authenticator)
        .expect("Failed to encrypt password");
    packet
        .add_attr("User-Password", encrypted_pwd)
        .expect("Failed to create User-Password attribute");

    packet
        .add_attr("NAS-IP-Address", "192.168.1.1")
        .expect("Failed to create NAS-IP-Address attribute");

    // Add additional attributes to test scaling
    for i in 0..num_attributes {
        packet
            .add_attr("Reply-Message", format!("attribute_{}", i))
            .expect("Failed to create Reply-Message attribute");
    }

    packet
}

fn bench_packet_encode(c: &mut Criterion) {
    let dict = Arc::new(Dictionary::builtin());
    let mut group = c.benchmark_group("packet_encode");

    for num_attrs in [0, 5, 10, 20].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_attrs),
            num_attrs,
            |b, &num_attrs| {
                let packet = create_test_packet(&dict, num_attrs);
                b.iter(|| packet.encode().expect("Failed to encode packet"));
            },
        );
    }

    group.finish();
}

fn bench_packet_parse(c: &mut Criterion) {
    let dict = Arc::new(Dictionary::builtin());
    let mut group = c.benchmark_group("packet_parse");

    for num_attrs in [0, 5, 10, 20].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_attrs),
            num_attrs,
            |b, &num_attrs| {
                let encoded = create_test_packet(&dict, num_attrs)
                    .encode()
                    .expect("Failed to encode");
                b.iter(|| {
                    Packet::parse(black_box(&encoded), SECRET, Arc::clone(&dict))
                        .expect("Failed to parse packet")
                });
            },
        );
    }

    group.finish();
}

fn bench_password(c: &mut Criterion) {
    let mut group = c.benchmark_group("user_password");

    let passwords = [
        ("short", "test"),
        ("medium", "testpassword123"),
        ("long", "this_is_a_very_long_password_to_test_performance"),
    ];

    for (name, password) in passwords.iter() {
        let req_auth = generate_request_authenticator();
        group.bench_with_input(BenchmarkId::new("encrypt", name), password, |b, &password| {
            b.iter(|| {
                encrypt_user_password(black_box(password), SECRET, black_box(&req_auth))
                    .expect("Failed to encrypt password")
            });
        });

        let encrypted =
            encrypt_user_password(password, SECRET, &req_auth).expect("Failed to encrypt password");
        group.bench_with_input(BenchmarkId::new("decrypt", name), &encrypted, |b, encrypted| {
            b.iter(|| {
                decrypt_user_password(black_box(encrypted), SECRET, black_box(&req_auth))
                    .expect("Failed to decrypt password")
            });
        });
    }

    group.finish();
}

fn bench_response_authenticator(c: &mut Criterion) {
    let dict = Arc::new(Dictionary::builtin());
    let request = create_test_packet(&dict, 0);
    let mut response = request.response(Code::AccessAccept);
    response
        .add_attr("Reply-Message", "Welcome")
        .expect("Failed to create Reply-Message attribute");
    let encoded = response.encode().expect("Failed to encode");

    c.bench_function("response_authenticator", |b| {
        b.iter(|| {
            calculate_response_authenticator(
                black_box(&encoded),
                black_box(&request.authenticator),
                SECRET,
            )
        });
    });
}

fn bench_full_request_cycle(c: &mut Criterion) {
    let dict = Arc::new(Dictionary::builtin());

    c.bench_function("full_request_encode_parse_pap", |b| {
        b.iter(|| {
            let packet = create_test_packet(&dict, 0);
            let encoded = packet.encode().expect("Failed to encode");
            let decoded =
                Packet::parse(&encoded, SECRET, Arc::clone(&dict)).expect("Failed to parse");
            black_box(decoded.pap())
        });
    });
}

criterion_group!(
    benches,
    bench_packet_encode,
    bench_packet_parse,
    bench_password,
    bench_response_authenticator,
    bench_full_request_cycle
);
criterion_main!(benches);
