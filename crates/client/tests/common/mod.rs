#![allow(dead_code)]

use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL.
///
/// The server task lives until the test runtime shuts down.
pub async fn spawn_stub(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A well-formed calculation service response for the "Ana" scenario.
pub fn calculation_json() -> serde_json::Value {
    serde_json::json!({
        "pre_reforma": {
            "saldo_acumulado": {
                "saldo_cuenta_individual": 60000000.0,
                "aporte_trabajador": 30000000.0,
                "aporte_empleador": 0.0,
                "rentabilidad_acumulada": 25000000.0
            },
            "aporte_sis": 0.0,
            "pension_mensual_base": 300000.0,
            "pension_total": 400000.0,
            "pgu_aplicada": true
        },
        "post_reforma": {
            "saldo_acumulado": {
                "saldo_cuenta_individual": 75000000.0,
                "aporte_trabajador": 30000000.0,
                "aporte_empleador": 12000000.0,
                "rentabilidad_acumulada": 28000000.0
            },
            "aporte_sis": 1500000.0,
            "pension_mensual_base": 380000.0,
            "pension_total": 500000.0,
            "pgu_aplicada": true
        },
        "pension_objetivo": {
            "valor_presente": 800000.0,
            "valor_futuro": 1900000.0,
            "tasa_inflacion_anual": 0.03,
            "brecha_mensual_post_reforma": 1400000.0
        },
        "metadata": {
            "nombre": "Ana",
            "edad": 30,
            "genero": "F",
            "edad_jubilacion": 65,
            "balance_actual": 5000000,
            "salario_mensual": 1200000,
            "estudios": "Universitaria completa",
            "expectativa_vida": 90
        }
    })
}
