//! Static customer reference data served by the stub endpoint.
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id_cliente: String,
    pub nombre: String,
    pub email: String,
    pub fecha_registro: String,
    pub segmento: String,
    pub pais: String,
}

// (registration date, segment, country) for C001..C010
const CUSTOMERS: [(&str, &str, &str); 10] = [
    ("2024-01-07", "Básico", "Chile"),
    ("2024-03-12", "Premium", "Chile"),
    ("2024-03-04", "Premium", "Colombia"),
    ("2024-04-13", "Estándar", "Perú"),
    ("2024-06-17", "Premium", "Colombia"),
    ("2024-04-08", "Premium", "Perú"),
    ("2024-01-06", "Básico", "Perú"),
    ("2024-01-01", "Estándar", "Colombia"),
    ("2024-01-28", "Básico", "Colombia"),
    ("2024-01-14", "Estándar", "Colombia"),
];

/// The fixed customer list, always in the same order.
pub fn customers() -> Vec<Customer> {
    CUSTOMERS
        .iter()
        .enumerate()
        .map(|(i, (fecha_registro, segmento, pais))| {
            let n = i + 1;
            Customer {
                id_cliente: format!("C{n:03}"),
                nombre: format!("Cliente {n}"),
                email: format!("cliente{n}@correo.com"),
                fecha_registro: fecha_registro.to_string(),
                segmento: segmento.to_string(),
                pais: pais.to_string(),
            }
        })
        .collect()
}
