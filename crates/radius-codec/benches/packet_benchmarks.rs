use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use radius_codec::attributes::codes::REPLY_MESSAGE;
use radius_codec::{
    AccessRequest, DictionaryParser, EmbeddedResolver, Packet, RadiusAttribute,
    decrypt_user_password, default_dictionary, encrypt_user_password, from_request_datagram,
    generate_request_authenticator, to_datagram,
};

const SECRET: &[u8] = b"testing123";

fn create_test_request(num_attributes: usize) -> Packet {
    let mut request = AccessRequest::new(default_dictionary(), 1, "testuser", "testpassword");
    for i in 0..num_attributes {
        request
            .packet_mut()
            .add_attribute(RadiusAttribute::string(REPLY_MESSAGE, &format!("attribute_{}", i)));
    }
    Packet::from(request)
}

fn bench_request_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_encode");

    for num_attrs in [0, 5, 10, 20].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_attrs),
            num_attrs,
            |b, &num_attrs| {
                let request = create_test_request(num_attrs);
                b.iter(|| {
                    let encoded = request.encode_request(SECRET).expect("Failed to encode request");
                    to_datagram(&encoded).expect("Failed to serialize request")
                });
            },
        );
    }

    group.finish();
}

fn bench_request_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decode");
    let dictionary = default_dictionary();

    for num_attrs in [0, 5, 10, 20].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_attrs),
            num_attrs,
            |b, &num_attrs| {
                let encoded = create_test_request(num_attrs)
                    .encode_request(SECRET)
                    .expect("Failed to encode");
                let bytes = to_datagram(&encoded).expect("Failed to serialize");
                b.iter(|| {
                    from_request_datagram(&dictionary, black_box(&bytes), SECRET)
                        .expect("Failed to decode request")
                });
            },
        );
    }

    group.finish();
}

fn bench_password_hiding(c: &mut Criterion) {
    let mut group = c.benchmark_group("password_hiding");

    let passwords = [
        ("short", "test"),
        ("medium", "testpassword123"),
        ("long", "this_is_a_very_long_password_to_test_performance"),
    ];

    for (name, password) in passwords.iter() {
        group.bench_with_input(BenchmarkId::new("encrypt", name), password, |b, &password| {
            let req_auth = generate_request_authenticator();
            b.iter(|| {
                encrypt_user_password(black_box(password.as_bytes()), black_box(SECRET), &req_auth)
                    .expect("Failed to encrypt password")
            });
        });
        group.bench_with_input(BenchmarkId::new("decrypt", name), password, |b, &password| {
            let req_auth = generate_request_authenticator();
            let encrypted = encrypt_user_password(password.as_bytes(), SECRET, &req_auth)
                .expect("Failed to encrypt password");
            b.iter(|| {
                decrypt_user_password(black_box(&encrypted), black_box(SECRET), &req_auth)
                    .expect("Failed to decrypt password")
            });
        });
    }

    group.finish();
}

fn bench_dictionary_load(c: &mut Criterion) {
    c.bench_function("builtin_dictionary_parse", |b| {
        let parser = DictionaryParser::new(EmbeddedResolver::builtin());
        b.iter(|| parser.parse(black_box("radius.dict")).expect("Failed to parse dictionary"));
    });
}

criterion_group!(
    benches,
    bench_request_encode,
    bench_request_decode,
    bench_password_hiding,
    bench_dictionary_load
);
criterion_main!(benches);
