use aegis_crypto::{AlgorithmTable, CryptoStrategy, EncryptionAlgo, Secret};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn strategy(table: &AlgorithmTable, algo: EncryptionAlgo) -> &dyn CryptoStrategy {
    table.cipher(algo).unwrap()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt_aes_gcm(bencher: divan::Bencher, size: usize) {
    let table = AlgorithmTable::standard();
    let cipher = strategy(&table, EncryptionAlgo::Aes256Gcm);
    let key = Secret::random(cipher.key_size()).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            cipher
                .encrypt(divan::black_box(&data), divan::black_box(&key), None)
                .unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt_aes_gcm(bencher: divan::Bencher, size: usize) {
    let table = AlgorithmTable::standard();
    let cipher = strategy(&table, EncryptionAlgo::Aes256Gcm);
    let key = Secret::random(cipher.key_size()).unwrap();
    let packet = cipher.encrypt(&make_data(size), &key, None).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            cipher
                .decrypt(divan::black_box(&packet), divan::black_box(&key), None)
                .unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt_xchacha(bencher: divan::Bencher, size: usize) {
    let table = AlgorithmTable::standard();
    let cipher = strategy(&table, EncryptionAlgo::XChaCha20Poly1305);
    let key = Secret::random(cipher.key_size()).unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            cipher
                .encrypt(divan::black_box(&data), divan::black_box(&key), None)
                .unwrap()
        });
}

fn main() {
    divan::main();
}
